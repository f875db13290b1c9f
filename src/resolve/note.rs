//! Note resolution: timing, ties and the trace queue.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Position};
use crate::library::Library;
use crate::settings::Settings;
use crate::state::{NoteEvent, PendingTie, RunningState, SharedState};
use crate::token::NoteToken;

use super::pitch::{resolve_pitch, PitchContext, PitchDict, ResolvedPitch};

pub struct NoteContext<'a> {
    pub settings: &'a Settings,
    pub library: &'a Library,
    pub dict: &'a PitchDict,
    pub position: Position,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteOutcome {
    /// Ids of the events this note started. Tied pitches start none.
    pub events: Vec<usize>,
    /// Length of the note in beats.
    pub beat: f64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Length in beats for a duration operator string.
///
/// ```
/// use scorewalk::resolve::beat_length;
///
/// assert_eq!(beat_length("", 0.0), 1.0);
/// assert_eq!(beat_length("-", 0.0), 2.0);
/// assert_eq!(beat_length("_.", 0.0), 0.75);
/// assert_eq!(beat_length("=", 1.0), 0.125);
/// ```
pub fn beat_length(ops: &str, unit: f64) -> f64 {
    let mut beat = 1.0;
    let mut chars = ops.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '=' => beat /= 4.0,
            '-' => beat += 1.0,
            '_' => beat /= 2.0,
            '.' => {
                let mut dots = 1;
                while chars.next_if_eq(&'.').is_some() {
                    dots += 1;
                }
                beat *= 2.0 - 2f64.powi(-dots);
            }
            _ => {}
        }
    }
    beat * 2f64.powf(-unit)
}

/// Resolve one note against the shared state of the current walk.
///
/// Advances `state.duration` and `state.beat_count`; the bar accumulators are
/// left to the caller.
pub fn resolve_note(
    note: &NoteToken,
    ctx: &NoteContext,
    shared: &mut SharedState,
    state: &mut RunningState,
) -> NoteOutcome {
    let settings = ctx.settings;
    let beat = beat_length(&note.duration_ops, settings.duration);
    let nominal = beat * 60.0 / settings.speed;
    let actual = nominal * (1.0 - settings.staccato(note.staccato));

    let mut outcome = NoteOutcome {
        beat,
        ..NoteOutcome::default()
    };
    let mut pitches: Vec<ResolvedPitch> = Vec::new();
    let mut traced = Vec::new();
    {
        let pitch_ctx = PitchContext {
            settings,
            library: ctx.library,
            dict: ctx.dict,
            trace: &shared.trace,
            note_pitch_ops: &note.pitch_ops,
            note_volume_ops: &note.volume_ops,
            position: ctx.position,
        };
        for spec in &note.pitches {
            let resolution = resolve_pitch(spec, &pitch_ctx);
            pitches.extend(resolution.pitches);
            traced.extend(resolution.traced);
            outcome.diagnostics.extend(resolution.diagnostics);
        }
    }

    let duplicated = duplicated_offsets(&pitches);
    if !duplicated.is_empty() {
        outcome.diagnostics.push(Diagnostic::at(
            DiagnosticKind::Reduplicate { actual: duplicated },
            ctx.position,
        ));
    }
    let loud: Vec<f64> = pitches
        .iter()
        .map(|p| p.volume)
        .filter(|&v| v > 1.0)
        .collect();
    if !loud.is_empty() {
        outcome.diagnostics.push(Diagnostic::at(
            DiagnosticKind::VolumeLimit { actual: loud },
            ctx.position,
        ));
    }
    if !traced.is_empty() {
        shared.trace.push(traced);
    }

    let mut carried = Vec::new();
    if shared.tie_left {
        shared.tie_left = false;
        for tie in std::mem::take(&mut shared.pending_tie) {
            let matched = pitches
                .iter()
                .position(|p| p.offset == tie.pitch && p.volume == tie.volume);
            let Some(i) = matched else { continue };
            pitches.remove(i);
            if let Some(event) = shared.event_mut(tie.event) {
                event.nominal_duration += nominal;
                event.duration += actual;
                event.beat += beat;
            }
            carried.push(tie);
        }
    }

    let mut fresh: Vec<NoteEvent> = pitches
        .iter()
        .map(|p| NoteEvent {
            pitch: p.offset,
            volume: p.volume.min(1.0),
            duration: actual,
            nominal_duration: nominal,
            beat,
            start_time: state.duration,
            start_beat: state.beat_count,
        })
        .collect();
    ctx.library.plugins.note_epilogue(&mut fresh, settings);

    for (event, pitch) in fresh.into_iter().zip(&pitches) {
        let id = shared.push_event(event);
        outcome.events.push(id);
        carried.push(PendingTie {
            event: id,
            pitch: pitch.offset,
            volume: pitch.volume,
        });
    }
    shared.pending_tie = carried;

    state.duration += nominal;
    state.beat_count += beat;
    outcome
}

/// Offsets that occur more than once, each listed once in first-seen order.
fn duplicated_offsets(pitches: &[ResolvedPitch]) -> Vec<i32> {
    let offsets: Vec<i32> = pitches.iter().filter_map(|p| p.offset).collect();
    let mut duplicated = Vec::new();
    for (i, offset) in offsets.iter().enumerate() {
        if offsets[..i].contains(offset) && !duplicated.contains(offset) {
            duplicated.push(*offset);
        }
    }
    duplicated
}
