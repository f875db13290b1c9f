use assert_approx_eq::assert_approx_eq;

use super::*;
use crate::diagnostic::{DiagnosticKind, Position};
use crate::library::{ChordRule, Library};
use crate::settings::Settings;
use crate::state::{RunningState, SharedState, TracedPitch};
use crate::token::{Degree, MacroPitches, NoteToken, PitchMacro, PitchSpec};

fn spec(degree: &str) -> PitchSpec {
    PitchSpec::new(Degree::from(degree.to_string()))
}

fn chorded(degree: &str, chord: &str) -> PitchSpec {
    PitchSpec {
        chord: chord.to_string(),
        ..spec(degree)
    }
}

fn resolve(spec: &PitchSpec, settings: &Settings, library: &Library, trace: &[Vec<TracedPitch>]) -> PitchResolution {
    let dict = PitchDict::from_macros(&[
        PitchMacro {
            name: "Kick".to_string(),
            pitches: MacroPitches::Fixed(vec![36]),
        },
        PitchMacro {
            name: "I".to_string(),
            pitches: MacroPitches::Degrees(vec![1, 3, 5]),
        },
    ]);
    let ctx = PitchContext {
        settings,
        library,
        dict: &dict,
        trace,
        note_pitch_ops: "",
        note_volume_ops: "",
        position: Position::default(),
    };
    resolve_pitch(spec, &ctx)
}

fn offsets(resolution: &PitchResolution) -> Vec<Option<i32>> {
    resolution.pitches.iter().map(|p| p.offset).collect()
}

fn kinds(resolution: &PitchResolution) -> Vec<&'static str> {
    resolution.diagnostics.iter().map(|d| d.kind.name()).collect()
}

#[test]
fn test_scale_degrees_follow_key() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.key = vec![2];
    let result = resolve(&spec("5"), &settings, &library, &[]);
    assert_eq!(offsets(&result), vec![Some(9)]);
    assert!(!result.pitches[0].fixed);
}

#[test]
fn test_rest_and_unpitched() {
    let library = Library::default();
    let mut settings = Settings::default();
    assert!(resolve(&spec("0"), &settings, &library, &[]).pitches.is_empty());

    settings.key = vec![0, 7];
    settings.volume = vec![1.0, 0.5];
    let hit = resolve(&spec("x"), &settings, &library, &[]);
    assert_eq!(offsets(&hit), vec![None, None]);
    assert_eq!(hit.pitches[1].volume, 0.5);
    assert!(hit.traced.is_empty());
}

#[test]
fn test_voices_offset_from_first_key() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.key = vec![2, 5];
    settings.volume = vec![1.0, 0.5];
    let result = resolve(&spec("1"), &settings, &library, &[]);
    assert_eq!(offsets(&result), vec![Some(2), Some(5)]);
    assert_eq!(result.pitches[1].volume, 0.5);
    assert_eq!(result.traced.len(), 1);
}

#[test]
fn test_operators() {
    let library = Library::default();
    let settings = Settings::default();
    let sharp_up = PitchSpec {
        pitch_ops: "#'".to_string(),
        volume_ops: ">:".to_string(),
        ..spec("3")
    };
    let result = resolve(&sharp_up, &settings, &library, &[]);
    assert_eq!(offsets(&result), vec![Some(17)]);
    assert_approx_eq!(result.pitches[0].volume, 1.0);
}

#[test]
fn test_fixed_macro_ignores_key_and_pitch_ops() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.key = vec![3, 7];
    let kick = PitchSpec {
        pitch_ops: "#".to_string(),
        volume_ops: ":".to_string(),
        ..spec("Kick")
    };
    let result = resolve(&kick, &settings, &library, &[]);
    assert_eq!(offsets(&result), vec![Some(36)]);
    assert!(result.pitches[0].fixed);
    assert_eq!(result.pitches[0].volume, 0.5);
}

#[test]
fn test_degree_macro_expands_like_degrees() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.key = vec![2];
    let result = resolve(&spec("I"), &settings, &library, &[]);
    assert_eq!(offsets(&result), vec![Some(2), Some(6), Some(9)]);
    assert!(result.pitches.iter().all(|p| !p.fixed));
}

#[test]
fn test_unknown_macro() {
    let library = Library::default();
    let result = resolve(&spec("Snare"), &Settings::default(), &library, &[]);
    assert!(result.pitches.is_empty());
    assert_eq!(kinds(&result), vec!["UnknownPitch"]);
}

#[test]
fn test_major_chord() {
    let library = Library::default();
    let result = resolve(&chorded("1", "M"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&result), vec![Some(0), Some(4), Some(7)]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_chords_expand_before_voices() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.key = vec![0, 12];
    let result = resolve(&chorded("1", "o"), &settings, &library, &[]);
    assert_eq!(offsets(&result), vec![Some(0), Some(12), Some(12), Some(24)]);
}

#[test]
fn test_chord_letters_compose() {
    let library = Library::default();
    // M -> [0, 4, 7], i -> [4, 7, 12]
    let result = resolve(&chorded("1", "Mi"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&result), vec![Some(4), Some(7), Some(12)]);
}

#[test]
fn test_chord_range_reverts_letter() {
    let library = Library::default();
    let result = resolve(&chorded("1", "jo"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&result), vec![Some(0), Some(12)]);
    assert_eq!(
        result.diagnostics[0].kind,
        DiagnosticKind::ChordRange {
            chord: 'j',
            expected: 0,
            actual: 2
        }
    );
}

#[test]
fn test_negative_chord_index_out_of_range() {
    let mut library = Library::default();
    library.set_chord('q', vec![ChordRule::new(-3, -1, 0)]);
    let result = resolve(&chorded("1", "oq"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&result), vec![Some(0), Some(12)]);
    assert_eq!(
        result.diagnostics[0].kind,
        DiagnosticKind::ChordRange {
            chord: 'q',
            expected: -2,
            actual: -3
        }
    );
}

#[test]
fn test_chord_on_fixed_note() {
    let library = Library::default();
    let result = resolve(&chorded("Kick", "M"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&result), vec![Some(36)]);
    assert_eq!(
        result.diagnostics[0].kind,
        DiagnosticKind::OnFixedNote { chord: 'M' }
    );
}

#[test]
fn test_unused_note_only_when_uncovered() {
    let mut library = Library::default();
    library.set_chord('s', vec![ChordRule::new(0, 0, 5)]);
    library.set_chord('t', vec![ChordRule::new(-1, -1, 0), ChordRule::new(0, 0, 7)]);

    let partial = resolve(&chorded("1", "Ms"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&partial), vec![Some(5)]);
    assert_eq!(
        partial.diagnostics[0].kind,
        DiagnosticKind::UnusedNote {
            chord: 's',
            unused: vec![1, 2]
        }
    );

    let full = resolve(&chorded("1", "ot"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&full), vec![Some(12), Some(7)]);
    assert!(full.diagnostics.is_empty());
}

#[test]
fn test_unknown_chord_letter_is_skipped() {
    let library = Library::default();
    let result = resolve(&chorded("1", "zM"), &Settings::default(), &library, &[]);
    assert_eq!(offsets(&result), vec![Some(0), Some(4), Some(7)]);
    assert_eq!(kinds(&result), vec!["UnknownChord"]);
}

#[test]
fn test_retrace_without_history() {
    let library = Library::default();
    let result = resolve(&spec("%"), &Settings::default(), &library, &[]);
    assert!(result.pitches.is_empty());
    assert_eq!(
        result.diagnostics[0].kind,
        DiagnosticKind::NoPrevious {
            expected: 1,
            actual: 0
        }
    );
}

#[test]
fn test_retrace_applies_delta_and_depth() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.trace = 2;
    let trace = vec![
        vec![TracedPitch {
            offset: 3,
            gain: 0.8,
            fixed: false,
        }],
        vec![TracedPitch {
            offset: 7,
            gain: 1.0,
            fixed: false,
        }],
    ];
    let up = PitchSpec {
        pitch_ops: "'".to_string(),
        ..spec("%")
    };
    let result = resolve(&up, &settings, &library, &trace);
    assert_eq!(offsets(&result), vec![Some(15)]);
    assert_approx_eq!(result.pitches[0].volume, 0.8);
}

#[test]
fn test_resolution_is_repeatable() {
    let library = Library::default();
    let mut settings = Settings::default();
    settings.key = vec![0, 4];
    let chord = chorded("I", "o");
    let first = resolve(&chord, &settings, &library, &[]);
    let second = resolve(&chord, &settings, &library, &[]);
    assert_eq!(first, second);
}

fn note(degrees: &[&str]) -> NoteToken {
    NoteToken {
        pitches: degrees.iter().map(|d| spec(d)).collect(),
        ..NoteToken::default()
    }
}

fn play(
    token: &NoteToken,
    settings: &Settings,
    shared: &mut SharedState,
    state: &mut RunningState,
) -> NoteOutcome {
    let library = Library::default();
    let dict = PitchDict::default();
    let ctx = NoteContext {
        settings,
        library: &library,
        dict: &dict,
        position: Position::default(),
    };
    resolve_note(token, &ctx, shared, state)
}

#[test]
fn test_beat_length_scan() {
    assert_eq!(beat_length("=", 0.0), 0.25);
    assert_eq!(beat_length("--", 0.0), 3.0);
    assert_eq!(beat_length(".", 0.0), 1.5);
    assert_eq!(beat_length("..", 0.0), 1.75);
    assert_eq!(beat_length("-.", 0.0), 3.0);
    assert_eq!(beat_length("_._", 0.0), 0.375);
    assert_eq!(beat_length("", 2.0), 0.25);
}

#[test]
fn test_note_timing() {
    let mut settings = Settings::default();
    settings.speed = 120.0;
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    let token = NoteToken {
        duration_ops: "-".to_string(),
        staccato: 1,
        ..note(&["1"])
    };
    let outcome = play(&token, &settings, &mut shared, &mut state);
    assert_eq!(outcome.beat, 2.0);
    let event = shared.event(outcome.events[0]).unwrap();
    assert_eq!(event.nominal_duration, 1.0);
    assert_eq!(event.duration, 0.5);
    assert_eq!(event.start_time, 0.0);

    let next = play(&note(&["2"]), &settings, &mut shared, &mut state);
    let event = shared.event(next.events[0]).unwrap();
    assert_eq!(event.start_time, 1.0);
    assert_eq!(event.start_beat, 2.0);
    assert_eq!(state.duration, 1.5);
    assert_eq!(state.beat_count, 3.0);
}

#[test]
fn test_trace_counts_pitched_notes() {
    let settings = Settings::default();
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    play(&note(&["1", "3"]), &settings, &mut shared, &mut state);
    play(&note(&["0"]), &settings, &mut shared, &mut state);
    play(&note(&["x"]), &settings, &mut shared, &mut state);
    play(&note(&["5"]), &settings, &mut shared, &mut state);
    assert_eq!(shared.trace.len(), 2);
    assert_eq!(shared.trace[0].len(), 2);
}

#[test]
fn test_retrace_plays_previous_note() {
    let mut settings = Settings::default();
    settings.key = vec![3];
    settings.volume = vec![0.8];
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    play(&note(&["1"]), &settings, &mut shared, &mut state);
    let outcome = play(&note(&["%"]), &settings, &mut shared, &mut state);
    let event = shared.event(outcome.events[0]).unwrap();
    assert_eq!(event.pitch, Some(3));
    assert_approx_eq!(event.volume, 0.8);
    assert_eq!(shared.trace.len(), 2);
}

#[test]
fn test_volume_limit_clips() {
    let mut settings = Settings::default();
    settings.volume = vec![0.65];
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    let token = NoteToken {
        volume_ops: ">".to_string(),
        ..note(&["1"])
    };
    let outcome = play(&token, &settings, &mut shared, &mut state);
    assert_eq!(shared.event(outcome.events[0]).unwrap().volume, 1.0);
    match &outcome.diagnostics[0].kind {
        DiagnosticKind::VolumeLimit { actual } => assert_approx_eq!(actual[0], 1.3),
        other => panic!("expected VolumeLimit, got {:?}", other),
    }
}

#[test]
fn test_reduplicate() {
    let settings = Settings::default();
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    let outcome = play(&note(&["1", "3", "1"]), &settings, &mut shared, &mut state);
    assert_eq!(outcome.events.len(), 3);
    assert_eq!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::Reduplicate { actual: vec![0] }
    );
}

#[test]
fn test_tie_extends_previous_event() {
    let settings = Settings::default();
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    let first = play(&note(&["1", "5"]), &settings, &mut shared, &mut state);
    shared.tie_left = true;
    let second = play(&note(&["1", "3"]), &settings, &mut shared, &mut state);

    assert!(!shared.tie_left);
    assert_eq!(second.events.len(), 1);
    let tied = shared.event(first.events[0]).unwrap();
    assert_eq!(tied.duration, 2.0);
    assert_eq!(tied.nominal_duration, 2.0);
    assert_eq!(tied.start_time, 0.0);
    assert_eq!(shared.event(first.events[1]).unwrap().duration, 1.0);
    assert_eq!(shared.event(second.events[0]).unwrap().pitch, Some(4));
    // the extended event and the fresh one can both be tied again
    assert_eq!(shared.pending_tie.len(), 2);
    assert_eq!(shared.pending_tie[0].event, first.events[0]);
}

#[test]
fn test_tied_staccato_notes_sum_actual_durations() {
    let settings = Settings::default();
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    let short = NoteToken {
        staccato: 1,
        ..note(&["1"])
    };
    let first = play(&short, &settings, &mut shared, &mut state);
    shared.tie_left = true;
    play(&note(&["1"]), &settings, &mut shared, &mut state);
    shared.tie_left = true;
    play(&short, &settings, &mut shared, &mut state);

    let tied = shared.event(first.events[0]).unwrap();
    // 0.5 + 1.0 + 0.5
    assert_approx_eq!(tied.duration, 2.0);
    assert_approx_eq!(tied.nominal_duration, 3.0);
    assert_approx_eq!(tied.beat, 3.0);
    assert_eq!(state.duration, 3.0);
}

#[test]
fn test_tie_requires_equal_volume() {
    let settings = Settings::default();
    let mut shared = SharedState::new();
    let mut state = RunningState::default();
    play(&note(&["1"]), &settings, &mut shared, &mut state);
    shared.tie_left = true;
    let light = NoteToken {
        volume_ops: ":".to_string(),
        ..note(&["1"])
    };
    let outcome = play(&light, &settings, &mut shared, &mut state);
    assert_eq!(outcome.events.len(), 1);
}
