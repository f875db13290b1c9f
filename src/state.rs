//! Running state of a walk.
//!
//! Two parts with different lifetimes:
//! - [`SharedState`] lives for one top-level track walk and is passed by
//!   mutable reference into every nested walk: pitch-trace queue, tie state and
//!   the event store. Ties and `%` therefore work across subtrack boundaries.
//! - [`RunningState`] belongs to a single walk: token cursor, bar accumulators,
//!   cumulative duration and beat counter. Nested walks start from zero and are
//!   merged back into the parent explicitly.

use std::collections::BTreeSet;

use serde::Serialize;

/// One sounding note produced by the walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// Semitone offset, `None` for an unpitched hit.
    pub pitch: Option<i32>,
    pub volume: f64,
    /// Sounding duration in seconds (after staccato).
    pub duration: f64,
    /// Notated duration in seconds.
    pub nominal_duration: f64,
    /// Length in beats.
    pub beat: f64,
    /// Seconds from the start of the track.
    pub start_time: f64,
    /// Beats from the start of the track.
    pub start_beat: f64,
}

/// One pitch of a recorded note, as `%` will replay it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TracedPitch {
    /// Offset for the first voice.
    pub offset: i32,
    /// Product of the volume operators applied to the pitch.
    pub gain: f64,
    pub fixed: bool,
}

/// The pitches of one note.
pub type TraceEntry = Vec<TracedPitch>;

/// An event the next note may extend if a tie sits in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTie {
    pub event: usize,
    pub pitch: Option<i32>,
    /// Volume before clipping.
    pub volume: f64,
}

/// State shared by every scope of one top-level walk.
#[derive(Debug, Default)]
pub struct SharedState {
    pub trace: Vec<TraceEntry>,
    pub pending_tie: Vec<PendingTie>,
    pub tie_left: bool,
    /// Named tracks being walked, outermost first.
    pub active_tracks: Vec<String>,
    events: Vec<NoteEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_event(&mut self, event: NoteEvent) -> usize {
        self.events.push(event);
        self.events.len() - 1
    }

    pub fn event(&self, id: usize) -> Option<&NoteEvent> {
        self.events.get(id)
    }

    pub(crate) fn event_mut(&mut self, id: usize) -> Option<&mut NoteEvent> {
        self.events.get_mut(id)
    }

    /// Move every event in `ids` later by `time` seconds and `beats` beats.
    pub(crate) fn shift_events(&mut self, ids: &[usize], time: f64, beats: f64) {
        for &id in ids {
            if let Some(event) = self.events.get_mut(id) {
                event.start_time += time;
                event.start_beat += beats;
            }
        }
    }

    /// Copy the events in `ids` out of the store, in order.
    pub fn collect_events(&self, ids: &[usize]) -> Vec<NoteEvent> {
        ids.iter()
            .filter_map(|&id| self.events.get(id))
            .cloned()
            .collect()
    }
}

/// Per-walk counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningState {
    /// Index of the token being processed.
    pub index: usize,
    /// Beats before the first closed bar.
    pub bar_first: f64,
    /// Beats in the currently open bar once a bar has closed.
    pub bar_last: f64,
    pub bar_count: usize,
    /// Seconds elapsed when the first bar closed.
    pub first_bar_time: f64,
    /// Seconds elapsed.
    pub duration: f64,
    /// Beats elapsed.
    pub beat_count: f64,
    /// Annotation kinds seen so far.
    pub after: BTreeSet<String>,
    /// Trace entries this walk appended; filled in when the walk finishes.
    pub trace: Vec<TraceEntry>,
    /// Tie state left for whatever follows; filled in when the walk finishes.
    pub tie_left: bool,
    /// Seconds covered by each finished overlay voice.
    pub voices: Vec<f64>,
    /// Longest beat count among finished overlay voices.
    pub voice_beats: f64,
}

impl RunningState {
    /// The accumulator of the bar still open.
    pub fn open_bar(&self) -> f64 {
        if self.bar_count == 0 {
            self.bar_first
        } else {
            self.bar_last
        }
    }

    pub(crate) fn add_beats(&mut self, beats: f64) {
        if self.bar_count == 0 {
            self.bar_first += beats;
        } else {
            self.bar_last += beats;
        }
    }
}
