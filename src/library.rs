//! Registries shared by every walk of a compilation: chord table, annotation
//! kinds, named tracks, functions and plugins.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::error::WalkError;
use crate::function::{builtins, FunctionRegistry};
use crate::plugin::{Plugin, PluginRegistry};
use crate::token::Token;

/// One chord rule: copy `list[head..=tail]` shifted by `delta` semitones.
/// Negative indices count from the end of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChordRule {
    pub head: i32,
    pub tail: i32,
    pub delta: i32,
}

impl ChordRule {
    pub const fn new(head: i32, tail: i32, delta: i32) -> Self {
        Self { head, tail, delta }
    }
}

/// How an annotation token kind is handled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnnotationSpec {
    /// Record a notation mark for each occurrence.
    #[serde(default)]
    pub preserve: bool,
    /// Bucket the marks go into.
    pub class: String,
}

/// Extra chords and annotation kinds, loadable from YAML.
///
/// ```yaml
/// chords:
///   s: [{ head: 0, tail: 0, delta: 0 }, { head: 0, tail: 0, delta: 5 }]
/// annotations:
///   Fermata: { preserve: true, class: Articulation }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub chords: BTreeMap<char, Vec<ChordRule>>,
    pub annotations: BTreeMap<String, AnnotationSpec>,
}

pub struct Library {
    chords: HashMap<char, Vec<ChordRule>>,
    annotations: HashMap<String, AnnotationSpec>,
    /// Every declared notation class, in declaration order.
    classes: Vec<String>,
    tracks: HashMap<String, Vec<Token>>,
    pub functions: FunctionRegistry,
    pub plugins: PluginRegistry,
}

impl Default for Library {
    fn default() -> Self {
        let mut library = Self::empty();
        for (letter, rules) in default_chords() {
            library.chords.insert(letter, rules);
        }
        builtins::register(&mut library.functions);
        library
    }
}

impl Library {
    /// A library with no chords, functions or plugins.
    pub fn empty() -> Self {
        Self {
            chords: HashMap::new(),
            annotations: HashMap::new(),
            classes: Vec::new(),
            tracks: HashMap::new(),
            functions: FunctionRegistry::default(),
            plugins: PluginRegistry::default(),
        }
    }

    /// The default library extended with the chords and annotations in `source`.
    pub fn from_yaml(source: &str) -> Result<Self, WalkError> {
        let config: LibraryConfig = serde_yaml::from_str(source)?;
        let mut library = Self::default();
        library.apply(config);
        Ok(library)
    }

    pub fn apply(&mut self, config: LibraryConfig) {
        for (letter, rules) in config.chords {
            self.chords.insert(letter, rules);
        }
        for (kind, spec) in config.annotations {
            self.register_annotation(&kind, spec);
        }
    }

    pub fn chord(&self, letter: char) -> Option<&[ChordRule]> {
        self.chords.get(&letter).map(Vec::as_slice)
    }

    pub fn set_chord(&mut self, letter: char, rules: Vec<ChordRule>) {
        self.chords.insert(letter, rules);
    }

    pub fn register_annotation(&mut self, kind: &str, spec: AnnotationSpec) {
        if !self.classes.contains(&spec.class) {
            self.classes.push(spec.class.clone());
        }
        self.annotations.insert(kind.to_string(), spec);
    }

    pub fn annotation(&self, kind: &str) -> Option<&AnnotationSpec> {
        self.annotations.get(kind)
    }

    pub fn notation_classes(&self) -> &[String] {
        &self.classes
    }

    pub fn define_track(&mut self, name: &str, content: Vec<Token>) {
        self.tracks.insert(name.to_string(), content);
    }

    pub fn track(&self, name: &str) -> Option<&[Token]> {
        self.tracks.get(name).map(Vec::as_slice)
    }

    /// Register a plugin and the annotation kinds it declares.
    pub fn register_plugin(&mut self, name: &str, plugin: Box<dyn Plugin>) {
        for (kind, spec) in plugin.annotations() {
            self.register_annotation(&kind, spec);
        }
        self.plugins.register(name, plugin);
    }
}

fn default_chords() -> Vec<(char, Vec<ChordRule>)> {
    let triad = |third: i32, fifth: i32| {
        vec![
            ChordRule::new(0, -1, 0),
            ChordRule::new(0, -1, third),
            ChordRule::new(0, -1, fifth),
        ]
    };
    vec![
        ('M', triad(4, 7)),
        ('m', triad(3, 7)),
        ('a', triad(4, 8)),
        ('d', triad(3, 6)),
        ('o', vec![ChordRule::new(0, -1, 0), ChordRule::new(0, -1, 12)]),
        ('i', vec![ChordRule::new(1, -1, 0), ChordRule::new(0, 0, 12)]),
        ('j', vec![ChordRule::new(2, -1, 0), ChordRule::new(0, 1, 12)]),
    ]
}
