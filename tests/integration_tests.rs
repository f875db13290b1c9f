//! Integration tests for the walker
//!
//! Tests full compilation from a YAML token tree to timed events.

use assert_approx_eq::assert_approx_eq;
use scorewalk::{compile, compile_yaml, Document, Library, WalkError};

#[test]
fn test_compile_simple_track() {
    let source = r#"
sections:
  - tracks:
      - id: Melody
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "3" }] }
          - { type: Note, pitches: [{ degree: "5" }] }
          - { type: Note, pitches: [{ degree: "1", pitch-ops: "'" }] }
          - { type: BarLine }
"#;
    let sections = compile_yaml(source).unwrap();
    assert_eq!(sections.len(), 1);
    let track = &sections[0].tracks[0];
    assert_eq!(track.id, "Melody#Piano");
    assert_eq!(track.instrument, "Piano");
    let pitches: Vec<Option<i32>> = track.events.iter().map(|e| e.pitch).collect();
    assert_eq!(pitches, vec![Some(0), Some(4), Some(7), Some(12)]);
    assert_eq!(track.events[3].start_time, 3.0);
    assert!(track.diagnostics.is_empty());
}

#[test]
fn test_bar_length_diagnostic() {
    // beats 1 + 1 + 1 + 2 = 5 in a bar of 4
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }], duration-ops: "-" }
          - { type: BarLine }
          - { type: Note, pitches: [{ degree: "1" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    let bar_length: Vec<_> = track.diagnostics_named("BarLength").collect();
    assert_eq!(bar_length.len(), 1);
    let yaml = serde_yaml::to_string(&bar_length[0].kind).unwrap();
    assert!(yaml.contains("expected: 4.0"));
    assert!(yaml.contains("actual: 5.0"));
}

#[test]
fn test_bar_of_four_point_one() {
    // Bar(4.1) declared, four quarter notes: the bar is 0.1 short
    let source = r#"
sections:
  - settings:
      - { name: Bar, args: [{ type: Number, value: 4.1 }] }
    tracks:
      - id: A
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: BarLine }
          - { type: Note, pitches: [{ degree: "2" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    assert_eq!(track.diagnostics_named("BarLength").count(), 1);
    assert_eq!(sections[0].settings.bar, 4.1);
}

#[test]
fn test_tie_joins_notes() {
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - { type: Function, name: Key, args: [{ type: Array, value: [0, 7] }] }
          - { type: Note, pitches: [{ degree: "1" }], staccato: 1 }
          - { type: Tie }
          - { type: Note, pitches: [{ degree: "1" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    // one event per voice, sounding 0.5 + 1.0 seconds
    assert_eq!(track.events.len(), 2);
    for event in &track.events {
        assert_eq!(event.start_time, 0.0);
        assert_eq!(event.nominal_duration, 2.0);
        assert_eq!(event.duration, 1.5);
    }
    assert_eq!(track.events[1].pitch, Some(7));
}

#[test]
fn test_volume_limit() {
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - { type: Function, name: Volume, args: [{ type: Number, value: 0.65 }] }
          - { type: Note, pitches: [{ degree: "1", volume-ops: ">" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    assert_eq!(track.events[0].volume, 1.0);
    assert_eq!(track.diagnostics_named("VolumeLimit").count(), 1);
}

#[test]
fn test_retrace() {
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - { type: Note, pitches: [{ degree: "%" }] }
          - { type: Function, name: Key, args: [{ type: Number, value: 1 }] }
          - { type: Function, name: Volume, args: [{ type: Number, value: 0.8 }] }
          - { type: Note, pitches: [{ degree: "2" }] }
          - { type: Note, pitches: [{ degree: "%" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    assert_eq!(track.diagnostics_named("NoPrevious").count(), 1);
    assert_eq!(track.events.len(), 2);
    assert_eq!(track.events[1].pitch, Some(3));
    assert_approx_eq!(track.events[1].volume, 0.8);
    assert_eq!(track.events[1].start_time, 2.0);
}

#[test]
fn test_repeat_with_voltas_and_coda() {
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - type: Subtrack
            repeat: 2
            content:
              - { type: Note, pitches: [{ degree: "1" }], duration-ops: "---" }
              - { type: BarLine, order: [1] }
              - { type: Note, pitches: [{ degree: "2" }], duration-ops: "---" }
              - { type: BarLine, order: [2] }
              - { type: Note, pitches: [{ degree: "3" }], duration-ops: "---" }
          - type: Subtrack
            repeat: -2
            content:
              - { type: Note, pitches: [{ degree: "5" }], duration-ops: "---" }
              - { type: BarLine, skip: true }
              - { type: Note, pitches: [{ degree: "6" }], duration-ops: "---" }
              - { type: BarLine }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    let pitches: Vec<Option<i32>> = track.events.iter().map(|e| e.pitch).collect();
    assert_eq!(
        pitches,
        vec![Some(0), Some(2), Some(0), Some(4), Some(7), Some(9), Some(7)]
    );
    assert!(track.diagnostics.is_empty(), "{:?}", track.diagnostics);
    // four bars from the voltas, two closed by the coda pass
    assert_eq!(track.state.bar_count, 6);
}

#[test]
fn test_named_track_reference() {
    let source = r#"
sections:
  - tracks:
      - id: Riff
        name: Riff
        play: false
        content:
          - { type: Note, pitches: [{ degree: "1", chord: M }], duration-ops: "---" }
      - id: Lead
        content:
          - { type: Macrotrack, name: Riff }
          - { type: Macrotrack, name: Riff }
"#;
    let sections = compile_yaml(source).unwrap();
    assert_eq!(sections[0].tracks.len(), 1);
    let track = &sections[0].tracks[0];
    assert_eq!(track.events.len(), 6);
    assert_eq!(track.events[3].start_time, 4.0);
}

#[test]
fn test_undefined_track_aborts() {
    let source = r#"
sections:
  - tracks:
      - id: Lead
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Macrotrack, name: Chorus }
"#;
    let document = Document::from_yaml(source).unwrap();
    let mut library = Library::default();
    match compile(&document, &mut library) {
        Err(WalkError::UndefinedTrack { name, index, .. }) => {
            assert_eq!(name, "Chorus");
            assert_eq!(index, 1);
        }
        other => panic!("expected UndefinedTrack, got {:?}", other),
    }
}

#[test]
fn test_recursive_named_track_is_a_diagnostic() {
    let source = r#"
sections:
  - tracks:
      - id: Loop
        name: Loop
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Macrotrack, name: Loop }
"#;
    let sections = compile_yaml(source).unwrap();
    let track = &sections[0].tracks[0];
    assert_eq!(track.events.len(), 1);
    let recursive: Vec<_> = track.diagnostics_named("RecursiveTrack").collect();
    assert_eq!(recursive.len(), 1);
    assert_eq!(track.diagnostics.len(), 1);
}

#[test]
fn test_unnamed_tracks_are_numbered() {
    let source = r#"
sections:
  - tracks:
      - content:
          - { type: Note, pitches: [{ degree: "1" }] }
      - instruments: [{ name: Piano }, { name: Violin }]
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
          - { type: Note, pitches: [{ degree: "1" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let ids: Vec<&str> = sections[0].tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["Piano#1", "Piano#2", "Violin#1"]);
    let diff: Vec<_> = sections[0]
        .diagnostics
        .iter()
        .filter(|d| d.is("DiffDuration"))
        .collect();
    assert_eq!(diff.len(), 1);
}

#[test]
fn test_prolog_settings_persist() {
    let source = r#"
sections:
  - prolog:
      - { name: Speed, args: [{ type: Number, value: 120 }] }
    tracks:
      - id: A
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
  - settings:
      - { name: Speed, args: [{ type: Number, value: 30 }] }
    tracks:
      - id: B
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
  - tracks:
      - id: C
        content:
          - { type: Note, pitches: [{ degree: "1" }] }
  - tracks: []
"#;
    let sections = compile_yaml(source).unwrap();
    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0].tracks[0].events[0].duration, 0.5);
    assert_eq!(sections[1].tracks[0].events[0].duration, 2.0);
    assert_eq!(sections[2].tracks[0].events[0].duration, 0.5);
}

#[test]
fn test_custom_chords_and_annotations() {
    let library_source = r#"
chords:
  s: [{ head: 0, tail: 0, delta: 0 }, { head: 0, tail: 0, delta: 5 }]
annotations:
  Fermata: { preserve: true, class: Articulation }
"#;
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - { type: Note, pitches: [{ degree: "1", chord: s }] }
          - { type: Annotation, kind: Fermata }
"#;
    let mut library = Library::from_yaml(library_source).unwrap();
    let document = Document::from_yaml(source).unwrap();
    let sections = compile(&document, &mut library).unwrap();
    let track = &sections[0].tracks[0];
    let pitches: Vec<Option<i32>> = track.events.iter().map(|e| e.pitch).collect();
    assert_eq!(pitches, vec![Some(0), Some(5)]);
    assert_eq!(track.notation["Articulation"][0].time, 1.0);
}

#[test]
fn test_result_serializes() {
    let source = r#"
sections:
  - tracks:
      - id: A
        content:
          - { type: Note, pitches: [{ degree: "x" }] }
"#;
    let sections = compile_yaml(source).unwrap();
    let yaml = serde_yaml::to_string(&sections[0]).unwrap();
    assert!(yaml.contains("startTime: 0.0"));
    assert!(yaml.contains("nominalDuration: 1.0"));
    assert!(yaml.contains("pitch: null"));
    assert!(yaml.contains("fadeIn: 0.0"));
}

#[test]
fn test_invalid_document() {
    let result = compile_yaml("sections: [{ tracks: [{ content: [{ type: Trill }] }] }]");
    assert!(matches!(result, Err(WalkError::Document(_))));
}
