//! Integration tests for score comparison
//!
//! Tests the full path from MusicXML files on disk to a score.

use std::fs;
use std::path::{Path, PathBuf};

use omreval::{compare_files, compare_files_detailed, EvalError, MeasureDiff};

/// Build a one-part score. Each measure is a space-separated list of quarter
/// notes such as "C4", "F#3", "r" (rest) or "C4+E4+G4" (chord).
fn score_xml(measures: &[(u32, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Music</part-name></score-part></part-list>
  <part id="P1">
"#,
    );
    for (i, (number, notes)) in measures.iter().enumerate() {
        xml.push_str(&format!("    <measure number=\"{}\">\n", number));
        if i == 0 {
            xml.push_str("      <attributes><divisions>4</divisions></attributes>\n");
        }
        for note in notes.split_whitespace() {
            if note == "r" {
                xml.push_str("      <note><rest/><duration>4</duration><type>quarter</type></note>\n");
                continue;
            }
            for (k, pitch) in note.split('+').enumerate() {
                let step = &pitch[..1];
                let alter = match &pitch[1..2] {
                    "#" => "<alter>1</alter>",
                    "b" => "<alter>-1</alter>",
                    _ => "",
                };
                let octave = pitch.trim_start_matches(|c: char| !c.is_ascii_digit());
                let chord = if k > 0 { "<chord/>" } else { "" };
                xml.push_str(&format!(
                    "      <note>{}<pitch><step>{}</step>{}<octave>{}</octave></pitch><duration>4</duration><type>quarter</type></note>\n",
                    chord, step, alter, octave
                ));
            }
        }
        xml.push_str("    </measure>\n");
    }
    xml.push_str("  </part>\n</score-partwise>\n");
    xml
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_identical_files_score_event_count() {
    let dir = tempfile::tempdir().unwrap();
    let xml = score_xml(&[(1, "C4 D4 E4 r"), (2, "C4+E4+G4 r r G4")]);
    let a = write(dir.path(), "a.xml", &xml);
    let b = write(dir.path(), "b.xml", &xml);

    let result = compare_files(&a, &b);
    assert!(result.is_ok(), "Should compare identical files");
    // measure 1: 4 events; measure 2: 3 chord pitches + 2 rests + G4
    assert_eq!(result.unwrap(), 10);
}

#[test]
fn test_substituted_note_scores_minus_one() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.xml", &score_xml(&[(1, "C4 D4")]));
    let b = write(dir.path(), "b.xml", &score_xml(&[(1, "C4 E4")]));

    let diff = compare_files_detailed(&a, &b).unwrap();
    assert_eq!(
        diff.measures,
        vec![MeasureDiff {
            measure: 1,
            common: 1,
            left_only: 1,
            right_only: 1
        }]
    );
    assert_eq!(diff.score(), -1);
}

#[test]
fn test_extra_measure_on_one_side() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.xml", &score_xml(&[(1, "A4"), (2, "B4")]));
    let b = write(dir.path(), "b.xml", &score_xml(&[(1, "A4")]));

    assert_eq!(compare_files(&a, &b).unwrap(), 0);
    assert_eq!(compare_files(&b, &a).unwrap(), 0);
}

#[test]
fn test_comparison_is_symmetric() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(
        dir.path(),
        "a.xml",
        &score_xml(&[(1, "C4 D4 E4 F4"), (2, "G4+B4 r"), (3, "C5")]),
    );
    let b = write(
        dir.path(),
        "b.xml",
        &score_xml(&[(1, "C4 D4 Eb4 F4"), (2, "G4 r"), (4, "C5")]),
    );

    assert_eq!(compare_files(&a, &b).unwrap(), compare_files(&b, &a).unwrap());
}

#[test]
fn test_spelling_matters() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.xml", &score_xml(&[(1, "C#4")]));
    let b = write(dir.path(), "b.xml", &score_xml(&[(1, "Db4")]));
    assert_eq!(compare_files(&a, &b).unwrap(), -2);
}

#[test]
fn test_repeated_note_counts_once() {
    let dir = tempfile::tempdir().unwrap();
    // Two voices playing the same C4 at the same time collapse to one event
    let xml = r#"<score-partwise><part id="P1"><measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice></note>
      <backup><duration>1</duration></backup>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><voice>2</voice></note>
    </measure></part></score-partwise>"#;
    let a = write(dir.path(), "a.xml", xml);
    assert_eq!(compare_files(&a, &a).unwrap(), 1);
}

#[test]
fn test_parse_error_names_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.xml", &score_xml(&[(1, "C4")]));
    let bad = write(dir.path(), "bad.xml", "<score-partwise><part>");

    match compare_files(&good, &bad) {
        Err(EvalError::Parse { path, .. }) => assert_eq!(path, bad),
        other => panic!("Should fail with a parse error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.xml", &score_xml(&[(1, "C4")]));
    let err = compare_files(&good, dir.path().join("nope.xml")).unwrap_err();
    assert_eq!(err.kind(), "io");
}
