//! Walk results.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::settings::Effects;
use crate::state::{NoteEvent, RunningState};

/// One preserved annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotationMark {
    pub kind: String,
    pub bar: usize,
    pub index: usize,
    /// Seconds from the start of the track.
    pub time: f64,
}

/// Notation marks by class.
pub type NotationBuckets = BTreeMap<String, Vec<NotationMark>>;

/// What a nested walk hands back to its parent.
///
/// Events stay in the shared event store of the top-level walk and are
/// referenced by id; their start times are relative to the nested walk until
/// the parent merges them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtrackResult {
    pub events: Vec<usize>,
    pub notation: NotationBuckets,
    pub diagnostics: Vec<Diagnostic>,
    pub state: RunningState,
}

impl SubtrackResult {
    /// Seconds covered by the nested walk.
    pub fn duration(&self) -> f64 {
        self.state.duration
    }

    pub fn bar_count(&self) -> usize {
        self.state.bar_count
    }
}

/// One walked (track, instrument) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    /// `track#instrument`, or `instrument#n` for an unnamed track.
    pub id: String,
    pub instrument: String,
    pub events: Vec<NoteEvent>,
    pub notation: NotationBuckets,
    pub diagnostics: Vec<Diagnostic>,
    pub state: RunningState,
    pub effects: Effects,
}

impl TrackResult {
    pub fn duration(&self) -> f64 {
        self.state.duration
    }

    /// Diagnostics of one kind, by variant name.
    pub fn diagnostics_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.is(name))
    }
}
