//! # MusicXML Reader
//!
//! Reads partwise MusicXML (plain `.xml`/`.musicxml` or the compressed
//! `.mxl` container) into [`MusicXmlScore`], the [`ScoreDocument`] the
//! piano-roll builder consumes.
//!
//! ## Timing
//! Each part keeps a running `<divisions>` value (divisions per quarter
//! note, carried across measures). Within a measure a cursor starts at 0:
//! - `<note>` advances it by `<duration>`, except chord members (`<chord/>`)
//!   and grace notes, which take no time
//! - `<backup>` moves it back, `<forward>` moves it ahead
//!
//! Every `<duration>` is converted to quarter notes with the divisions in
//! force at that element, so `<duration>2</duration>` under
//! `<divisions>4</divisions>` is an eighth note, `1/2`. The cursor itself
//! counts quarter notes and survives a divisions change mid-measure.
//!
//! ## Chords
//! A note followed by one or more `<chord/>` notes is one chord. The chord's
//! offset and duration are those of its first note.
//!
//! ## Measure Numbers
//! The leading digits of the `number` attribute (`"12a"` is measure 12).
//! A number without leading digits is a parse error.
//!
//! ## Compressed Files
//! A `.mxl` file is a zip archive. The score inside is named by
//! `META-INF/container.xml`; failing that, the first `.xml`/`.musicxml`
//! entry outside `META-INF/` is used. Files are recognized by their zip
//! signature, not their extension.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::document::{ChordItem, MeasureHandle, NoteItem, RestItem, ScoreDocument};
use crate::error::EvalError;
use crate::event::{Beats, Pitch, Step};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CONTAINER_PATH: &str = "META-INF/container.xml";

/// One `<measure>` element of one part, resolved to timed items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlMeasure {
    pub number: u32,
    pub rests: Vec<RestItem>,
    pub notes: Vec<NoteItem>,
    pub chords: Vec<ChordItem>,
}

impl XmlMeasure {
    fn new(number: u32) -> Self {
        XmlMeasure {
            number,
            rests: Vec::new(),
            notes: Vec::new(),
            chords: Vec::new(),
        }
    }
}

impl MeasureHandle for XmlMeasure {
    fn number(&self) -> u32 {
        self.number
    }

    fn rests(&self) -> &[RestItem] {
        &self.rests
    }

    fn notes(&self) -> &[NoteItem] {
        &self.notes
    }

    fn chords(&self) -> &[ChordItem] {
        &self.chords
    }
}

/// A parsed partwise score: every measure of every part, in document order
#[derive(Debug, Clone, Default)]
pub struct MusicXmlScore {
    measures: Vec<XmlMeasure>,
}

impl ScoreDocument for MusicXmlScore {
    type Measure = XmlMeasure;

    fn measures(&self) -> &[XmlMeasure] {
        &self.measures
    }
}

impl MusicXmlScore {
    /// Parse an uncompressed MusicXML document held in memory.
    ///
    /// # Example
    /// ```
    /// use omreval::{MusicXmlScore, ScoreDocument};
    ///
    /// let xml = r#"<score-partwise version="4.0"><part id="P1">
    ///   <measure number="1"><note><rest/><duration>4</duration></note></measure>
    /// </part></score-partwise>"#;
    /// let score = MusicXmlScore::parse(xml)?;
    /// assert_eq!(score.measures().len(), 1);
    /// # Ok::<(), omreval::EvalError>(())
    /// ```
    pub fn parse(xml: &str) -> Result<Self, EvalError> {
        parse_score(xml).map_err(|message| EvalError::parse("<memory>", message))
    }

    /// Read a score file from disk, plain or compressed.
    pub fn read(path: &Path) -> Result<Self, EvalError> {
        let bytes = fs::read(path).map_err(|e| EvalError::io(path, e))?;
        let xml = if bytes.starts_with(ZIP_MAGIC) {
            extract_root_score(&bytes)
        } else {
            decode_text(bytes)
        }
        .map_err(|message| EvalError::parse(path, message))?;
        parse_score(&xml).map_err(|message| EvalError::parse(path, message))
    }
}

fn decode_text(bytes: Vec<u8>) -> Result<String, String> {
    let text = String::from_utf8(bytes).map_err(|_| "document is not valid UTF-8".to_string())?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Pull the root score document out of a `.mxl` archive
fn extract_root_score(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("bad .mxl archive: {}", e))?;

    let from_container = match archive.by_name(CONTAINER_PATH) {
        Ok(mut entry) => {
            let mut raw = Vec::new();
            entry
                .read_to_end(&mut raw)
                .map_err(|e| format!("cannot read {}: {}", CONTAINER_PATH, e))?;
            let container = parse_tree(&decode_text(raw)?)?;
            container
                .find("rootfile")
                .and_then(|rootfile| rootfile.attr("full-path"))
                .map(str::to_string)
        }
        Err(_) => None,
    };

    let root_path = match from_container {
        Some(path) => path,
        None => archive
            .file_names()
            .filter(|name| !name.starts_with("META-INF/"))
            .find(|name| name.ends_with(".xml") || name.ends_with(".musicxml"))
            .map(str::to_string)
            .ok_or_else(|| "no score document inside .mxl archive".to_string())?,
    };

    let mut entry = archive
        .by_name(&root_path)
        .map_err(|e| format!("cannot open {} in archive: {}", root_path, e))?;
    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .map_err(|e| format!("cannot read {} in archive: {}", root_path, e))?;
    decode_text(raw)
}

// ---------------------------------------------------------------------------
// Minimal element tree
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlNode>,
    text: String,
}

impl XmlNode {
    fn from_start(start: &BytesStart) -> Result<Self, String> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
            attrs.push((key, value));
        }
        Ok(XmlNode {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs,
            ..XmlNode::default()
        })
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn has(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    /// Depth-first search for the first descendant with this name
    fn find(&self, name: &str) -> Option<&XmlNode> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.find(name) })
    }
}

fn parse_tree(xml: &str) -> Result<XmlNode, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed XML at byte {}: {}", reader.buffer_position(), e))?;
        match event {
            XmlEvent::Start(start) => stack.push(XmlNode::from_start(&start)?),
            XmlEvent::Empty(start) => {
                let node = XmlNode::from_start(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            XmlEvent::End(_) => {
                let node = stack.pop().ok_or("unbalanced closing tag")?;
                attach(&mut stack, &mut root, node)?;
            }
            XmlEvent::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            XmlEvent::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "empty document".to_string())
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(format!("second root element <{}>", node.name)),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Score extraction
// ---------------------------------------------------------------------------

fn parse_score(xml: &str) -> Result<MusicXmlScore, String> {
    let root = parse_tree(xml)?;
    if root.name != "score-partwise" {
        return Err(format!(
            "unsupported root element <{}>, expected <score-partwise>",
            root.name
        ));
    }

    let mut measures = Vec::new();
    for part in root.children.iter().filter(|c| c.name == "part") {
        let mut divisions: i64 = 1;
        for measure in part.children.iter().filter(|c| c.name == "measure") {
            measures.push(read_measure(measure, &mut divisions)?);
        }
    }
    Ok(MusicXmlScore { measures })
}

fn parse_measure_number(raw: Option<&str>) -> Result<u32, String> {
    let raw = raw.ok_or("measure without a number attribute")?;
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse()
        .map_err(|_| format!("invalid measure number '{}'", raw))
}

/// Parse a non-negative division count. MusicXML allows decimals here, but
/// only whole numbers are meaningful once divisions are set correctly.
fn parse_divisions(raw: &str, what: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        if n >= 0 {
            return Ok(n);
        }
    }
    match raw.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(format!("invalid {} '{}'", what, raw)),
    }
}

enum Sound {
    Rest,
    Pitched(Pitch),
}

fn read_pitch(step: Option<&str>, alter: Option<&str>, octave: Option<&str>) -> Result<Pitch, String> {
    let step_text = step.ok_or("pitch without a step")?;
    let step = Step::from_str(step_text).ok_or_else(|| format!("invalid step '{}'", step_text))?;
    let alter = match alter {
        None => 0,
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(a) if a.fract() == 0.0 && a.abs() <= 3.0 => a as i8,
            _ => return Err(format!("unsupported alter '{}'", raw)),
        },
    };
    let octave_text = octave.ok_or("pitch without an octave")?;
    let octave = octave_text
        .parse()
        .map_err(|_| format!("invalid octave '{}'", octave_text))?;
    Ok(Pitch::new(step, alter, octave))
}

fn read_sound(note: &XmlNode) -> Result<Sound, String> {
    if note.has("rest") {
        return Ok(Sound::Rest);
    }
    if let Some(pitch) = note.child("pitch") {
        return read_pitch(
            pitch.child_text("step"),
            pitch.child_text("alter"),
            pitch.child_text("octave"),
        )
        .map(Sound::Pitched);
    }
    if let Some(unpitched) = note.child("unpitched") {
        return read_pitch(
            unpitched.child_text("display-step"),
            None,
            unpitched.child_text("display-octave"),
        )
        .map(Sound::Pitched);
    }
    Err("note without <pitch>, <unpitched> or <rest>".to_string())
}

/// A rest or a run of simultaneous pitches waiting to be filed
struct Group {
    rest: bool,
    pitches: Vec<Pitch>,
    onset: Beats,
    duration: Beats,
}

fn flush(group: Option<Group>, measure: &mut XmlMeasure) {
    let Some(group) = group else { return };
    let (offset, duration) = (group.onset, group.duration);
    if group.rest {
        measure.rests.push(RestItem { offset, duration });
    } else if group.pitches.len() == 1 {
        measure.notes.push(NoteItem {
            pitch: group.pitches[0],
            offset,
            duration,
        });
    } else {
        measure.chords.push(ChordItem {
            pitches: group.pitches,
            offset,
            duration,
        });
    }
}

/// `<duration>` of `node` in quarter notes, under the divisions in force
fn read_duration(node: &XmlNode, divisions: i64) -> Result<Beats, String> {
    let raw = node.child_text("duration").unwrap_or("0");
    Ok(Beats::new(parse_divisions(raw, "duration")?, divisions))
}

fn read_measure(node: &XmlNode, divisions: &mut i64) -> Result<XmlMeasure, String> {
    let number = parse_measure_number(node.attr("number"))?;
    let mut measure = XmlMeasure::new(number);
    let zero = Beats::from_integer(0);
    let mut cursor = zero;
    let mut last_onset = zero;
    let mut pending: Option<Group> = None;

    for child in &node.children {
        match child.name.as_str() {
            "attributes" => {
                if let Some(raw) = child.child_text("divisions") {
                    let value = parse_divisions(raw, "divisions")?;
                    if value == 0 {
                        return Err(format!("zero divisions in measure {}", number));
                    }
                    *divisions = value;
                }
            }
            "backup" | "forward" => {
                flush(pending.take(), &mut measure);
                let amount = read_duration(child, *divisions)?;
                cursor = if child.name == "backup" {
                    (cursor - amount).max(zero)
                } else {
                    cursor + amount
                };
            }
            "note" => {
                let is_chord = child.has("chord");
                let duration = if child.has("grace") {
                    zero
                } else {
                    read_duration(child, *divisions)?
                };
                let sound = read_sound(child)?;

                if is_chord {
                    if let (Some(group), Sound::Pitched(pitch)) = (pending.as_mut(), &sound) {
                        if !group.rest {
                            group.pitches.push(*pitch);
                            continue;
                        }
                    }
                }

                flush(pending.take(), &mut measure);
                let onset = if is_chord { last_onset } else { cursor };
                pending = Some(match sound {
                    Sound::Rest => Group {
                        rest: true,
                        pitches: Vec::new(),
                        onset,
                        duration,
                    },
                    Sound::Pitched(pitch) => Group {
                        rest: false,
                        pitches: vec![pitch],
                        onset,
                        duration,
                    },
                });
                if !is_chord {
                    cursor += duration;
                }
                last_onset = onset;
            }
            _ => {}
        }
    }
    flush(pending, &mut measure);

    Ok(measure)
}
