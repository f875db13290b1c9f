//! # Token Tree Types
//!
//! The token tree handed over by the tokenizer, plus the document structure
//! (sections, tracks, instruments) that wraps it.
//!
//! ## Type Hierarchy
//! ```text
//! Document
//!   └── Vec<Section>
//!         ├── prolog: Vec<FunctionToken>   (global settings)
//!         ├── settings: Vec<FunctionToken> (section settings)
//!         └── Vec<TrackDef>
//!               ├── id / name / play
//!               ├── Vec<Instrument> (name, spec tokens, pitch dict)
//!               └── content: Vec<Token>
//!
//! Token (enum)
//!   ├── Note        pitch specs + duration/volume/pitch operators + staccato
//!   ├── Function    named macro call with arguments
//!   ├── Subtrack    nested content with repeat count
//!   ├── Macrotrack  reference to a named track
//!   ├── Tie
//!   ├── BarLine     skip (coda) / overlay / volta order / terminal
//!   ├── Clef, Comment, Space
//!   └── Annotation  any other notation kind, by name
//! ```
//!
//! All types deserialize from YAML or JSON with a `type` tag on tokens, so the
//! external tokenizer can hand over its output as plain data.

use serde::{Deserialize, Serialize};

use crate::error::WalkError;

/// One token of a track's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Token {
    Note(NoteToken),
    Function(FunctionToken),
    Subtrack(SubtrackToken),
    Macrotrack { name: String },
    Tie,
    BarLine(BarLine),
    Clef {
        #[serde(default)]
        name: String,
    },
    Comment {
        #[serde(default)]
        text: String,
    },
    Space,
    Annotation { kind: String },
}

impl Token {
    /// A plain bar line that plays on every pass.
    pub fn bar_line() -> Self {
        Token::BarLine(BarLine::default())
    }

    pub fn is_bar_line(&self) -> bool {
        matches!(self, Token::BarLine(_))
    }

    /// True for a bar line that carries a coda / skip marker.
    pub fn is_coda(&self) -> bool {
        matches!(self, Token::BarLine(bar) if bar.skip)
    }
}

/// A note: one or more simultaneous pitch specs sharing duration and articulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NoteToken {
    pub pitches: Vec<PitchSpec>,
    /// Pitch operators applied to every pitch of the note (`#`, `b`, `'`, `,`).
    pub pitch_ops: String,
    /// Duration operators (`=`, `-`, `_`, `.`).
    pub duration_ops: String,
    /// Volume operators applied to every pitch of the note (`>`, `:`).
    pub volume_ops: String,
    /// Index into the staccato table.
    pub staccato: usize,
}

/// One pitch inside a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PitchSpec {
    pub degree: Degree,
    #[serde(default)]
    pub pitch_ops: String,
    #[serde(default)]
    pub chord: String,
    #[serde(default)]
    pub volume_ops: String,
}

impl PitchSpec {
    pub fn new(degree: Degree) -> Self {
        Self {
            degree,
            pitch_ops: String::new(),
            chord: String::new(),
            volume_ops: String::new(),
        }
    }
}

/// What a pitch spec refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Degree {
    /// `0`
    Rest,
    /// `x`
    Unpitched,
    /// `%`
    Retrace,
    /// `1` to `7`
    Scale(u8),
    /// Any other name, looked up in the instrument's pitch dictionary.
    Macro(String),
}

impl From<String> for Degree {
    fn from(s: String) -> Self {
        match s.as_str() {
            "0" => Degree::Rest,
            "x" => Degree::Unpitched,
            "%" => Degree::Retrace,
            "1" => Degree::Scale(1),
            "2" => Degree::Scale(2),
            "3" => Degree::Scale(3),
            "4" => Degree::Scale(4),
            "5" => Degree::Scale(5),
            "6" => Degree::Scale(6),
            "7" => Degree::Scale(7),
            _ => Degree::Macro(s),
        }
    }
}

impl From<Degree> for String {
    fn from(degree: Degree) -> Self {
        match degree {
            Degree::Rest => "0".to_string(),
            Degree::Unpitched => "x".to_string(),
            Degree::Retrace => "%".to_string(),
            Degree::Scale(n) => n.to_string(),
            Degree::Macro(name) => name,
        }
    }
}

/// Nested content, optionally repeated.
///
/// A positive `repeat` plays the content that many times with volta
/// selection; zero or negative plays it `-repeat` times with coda handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtrackToken {
    #[serde(default = "default_repeat")]
    pub repeat: i32,
    #[serde(default)]
    pub content: Vec<Token>,
}

fn default_repeat() -> i32 {
    -1
}

impl SubtrackToken {
    pub fn new(content: Vec<Token>) -> Self {
        Self {
            repeat: default_repeat(),
            content,
        }
    }

    pub fn repeated(repeat: i32, content: Vec<Token>) -> Self {
        Self { repeat, content }
    }
}

/// A bar line with its repeat-structure annotations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BarLine {
    /// Coda / skip marker.
    pub skip: bool,
    /// Following content starts again at time zero.
    pub overlay: bool,
    /// Volta passes. Absent or starting with 0 means every pass; an empty
    /// list is the default volta that takes all unclaimed passes.
    pub order: Option<Vec<u32>>,
    pub terminal: bool,
}

impl BarLine {
    pub fn volta(order: Vec<u32>) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn coda() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    /// True when this bar line only plays on selected passes.
    pub fn is_volta(&self) -> bool {
        match &self.order {
            Some(order) => order.first() != Some(&0),
            None => false,
        }
    }
}

/// A call to a registered function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionToken {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Arg>,
}

/// A function argument as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Arg {
    Number(f64),
    String(String),
    Array(Vec<f64>),
    Expression(String),
    /// Any other token, walked as a one-token subtrack.
    Token(Box<Token>),
}

/// An instrument a track is played on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    /// Tokens prepended to the track content for this instrument.
    #[serde(default)]
    pub spec: Vec<Token>,
    /// Named pitch macros.
    #[serde(default)]
    pub dict: Vec<PitchMacro>,
}

impl Instrument {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            spec: Vec::new(),
            dict: Vec::new(),
        }
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self::new("Piano")
    }
}

/// A named pitch macro: either absolute constants or scale-degree notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchMacro {
    pub name: String,
    #[serde(flatten)]
    pub pitches: MacroPitches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroPitches {
    /// Absolute offsets, untouched by key and pitch operators.
    Fixed(Vec<i32>),
    /// Scale degrees 1-7, expanded like written degrees.
    Degrees(Vec<u8>),
}

/// A track definition inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDef {
    /// Identifier used for the result id; empty means unnamed.
    #[serde(default)]
    pub id: String,
    /// Name under which the content is registered for macrotrack references.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_play")]
    pub play: bool,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub content: Vec<Token>,
}

fn default_play() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    /// Function calls applied to the global settings before this section.
    pub prolog: Vec<FunctionToken>,
    /// Function calls applied to this section's settings only.
    pub settings: Vec<FunctionToken>,
    pub tracks: Vec<TrackDef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    /// Load a token tree from YAML (JSON is accepted as a subset).
    pub fn from_yaml(source: &str) -> Result<Self, WalkError> {
        Ok(serde_yaml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_from_string() {
        assert_eq!(Degree::from("0".to_string()), Degree::Rest);
        assert_eq!(Degree::from("x".to_string()), Degree::Unpitched);
        assert_eq!(Degree::from("%".to_string()), Degree::Retrace);
        assert_eq!(Degree::from("5".to_string()), Degree::Scale(5));
        assert_eq!(Degree::from("8".to_string()), Degree::Macro("8".to_string()));
        assert_eq!(Degree::from("Kick".to_string()), Degree::Macro("Kick".to_string()));
    }

    #[test]
    fn test_volta_classification() {
        assert!(!BarLine::default().is_volta());
        assert!(!BarLine::volta(vec![0]).is_volta());
        assert!(BarLine::volta(vec![]).is_volta());
        assert!(BarLine::volta(vec![1, 3]).is_volta());
    }

    #[test]
    fn test_token_tree_from_yaml() {
        let source = r#"
sections:
  - tracks:
      - id: Melody
        instruments:
          - name: Violin
        content:
          - type: Note
            pitches:
              - degree: "1"
                chord: M
            duration-ops: "-"
          - type: Tie
          - type: BarLine
            order: [1]
          - type: Subtrack
            repeat: 2
            content:
              - type: Note
                pitches: [{ degree: "%" }]
          - type: Function
            name: Speed
            args:
              - type: Number
                value: 120
          - type: Macrotrack
            name: Intro
"#;
        let document = Document::from_yaml(source).unwrap();
        let track = &document.sections[0].tracks[0];
        assert!(track.play);
        assert_eq!(track.instruments[0].name, "Violin");
        assert_eq!(track.content.len(), 6);
        match &track.content[0] {
            Token::Note(note) => {
                assert_eq!(note.pitches[0].degree, Degree::Scale(1));
                assert_eq!(note.pitches[0].chord, "M");
                assert_eq!(note.duration_ops, "-");
            }
            other => panic!("expected note, got {:?}", other),
        }
        assert_eq!(track.content[1], Token::Tie);
        assert_eq!(track.content[2], Token::BarLine(BarLine::volta(vec![1])));
        match &track.content[3] {
            Token::Subtrack(sub) => {
                assert_eq!(sub.repeat, 2);
                assert_eq!(sub.content.len(), 1);
            }
            other => panic!("expected subtrack, got {:?}", other),
        }
        match &track.content[4] {
            Token::Function(func) => assert_eq!(func.args, vec![Arg::Number(120.0)]),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_subtrack_default_repeat() {
        let sub: SubtrackToken = serde_yaml::from_str("content: []").unwrap();
        assert_eq!(sub.repeat, -1);
    }

    #[test]
    fn test_pitch_macro_forms() {
        let fixed: PitchMacro = serde_yaml::from_str("name: Kick\nfixed: [36]").unwrap();
        assert_eq!(fixed.pitches, MacroPitches::Fixed(vec![36]));
        let degrees: PitchMacro = serde_yaml::from_str("name: I\ndegrees: [1, 3, 5]").unwrap();
        assert_eq!(degrees.pitches, MacroPitches::Degrees(vec![1, 3, 5]));
    }
}
