//! Pitch spec resolution.

use std::collections::HashMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind, Position};
use crate::library::{ChordRule, Library};
use crate::settings::Settings;
use crate::state::{TraceEntry, TracedPitch};
use crate::token::{Degree, MacroPitches, PitchMacro, PitchSpec};

const SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Named pitch macros of one instrument.
#[derive(Debug, Clone, Default)]
pub struct PitchDict {
    macros: HashMap<String, MacroPitches>,
}

impl PitchDict {
    pub fn from_macros(macros: &[PitchMacro]) -> Self {
        Self {
            macros: macros
                .iter()
                .map(|m| (m.name.clone(), m.pitches.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MacroPitches> {
        self.macros.get(name)
    }
}

/// Everything a pitch spec resolves against.
pub struct PitchContext<'a> {
    pub settings: &'a Settings,
    pub library: &'a Library,
    pub dict: &'a PitchDict,
    pub trace: &'a [TraceEntry],
    /// Operators written on the note, applied before the pitch's own.
    pub note_pitch_ops: &'a str,
    pub note_volume_ops: &'a str,
    pub position: Position,
}

/// One concrete pitch for one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPitch {
    pub offset: Option<i32>,
    /// Volume before clipping.
    pub volume: f64,
    pub fixed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchResolution {
    pub pitches: Vec<ResolvedPitch>,
    /// First-voice pitches, for the trace queue.
    pub traced: Vec<TracedPitch>,
    pub diagnostics: Vec<Diagnostic>,
}

fn pitch_delta(ops: &str) -> i32 {
    ops.chars()
        .map(|c| match c {
            '#' => 1,
            'b' => -1,
            '\'' => 12,
            ',' => -12,
            _ => 0,
        })
        .sum()
}

fn volume_scale(ops: &str, settings: &Settings) -> f64 {
    ops.chars().fold(1.0, |scale, c| match c {
        '>' => scale * settings.accent,
        ':' => scale * settings.light,
        _ => scale,
    })
}

fn scale_degree(n: u8) -> Option<i32> {
    SCALE.get(usize::from(n).checked_sub(1)?).copied()
}

/// Resolve one pitch spec. Never fails; problems come back as diagnostics.
pub fn resolve_pitch(spec: &PitchSpec, ctx: &PitchContext) -> PitchResolution {
    let settings = ctx.settings;
    let mut resolution = PitchResolution::default();
    let delta = pitch_delta(ctx.note_pitch_ops) + pitch_delta(&spec.pitch_ops);
    let gain = volume_scale(ctx.note_volume_ops, settings) * volume_scale(&spec.volume_ops, settings);
    let key_root = settings.key.first().copied().unwrap_or(0);
    let degree_pitch = |n: u8| {
        scale_degree(n).map(|semitones| TracedPitch {
            offset: key_root + semitones + delta,
            gain,
            fixed: false,
        })
    };

    let base: Vec<TracedPitch> = match &spec.degree {
        Degree::Rest => return resolution,
        Degree::Unpitched => {
            resolution.pitches = (0..settings.key.len().max(1))
                .map(|voice| ResolvedPitch {
                    offset: None,
                    volume: settings.voice_volume(voice) * gain,
                    fixed: false,
                })
                .collect();
            return resolution;
        }
        Degree::Retrace => {
            let depth = settings.trace;
            let recorded = ctx.trace.len();
            if depth == 0 || recorded < depth {
                resolution.diagnostics.push(Diagnostic::at(
                    DiagnosticKind::NoPrevious {
                        expected: depth,
                        actual: recorded,
                    },
                    ctx.position,
                ));
                return resolution;
            }
            ctx.trace[recorded - depth]
                .iter()
                .map(|p| TracedPitch {
                    offset: if p.fixed {
                        p.offset
                    } else {
                        p.offset.saturating_add(delta)
                    },
                    gain: p.gain * gain,
                    fixed: p.fixed,
                })
                .collect()
        }
        Degree::Scale(n) => degree_pitch(*n).into_iter().collect(),
        Degree::Macro(name) => match ctx.dict.get(name) {
            Some(MacroPitches::Fixed(offsets)) => offsets
                .iter()
                .map(|&offset| TracedPitch {
                    offset,
                    gain,
                    fixed: true,
                })
                .collect(),
            Some(MacroPitches::Degrees(degrees)) => {
                degrees.iter().filter_map(|&n| degree_pitch(n)).collect()
            }
            None => {
                resolution.diagnostics.push(Diagnostic::at(
                    DiagnosticKind::UnknownPitch { name: name.clone() },
                    ctx.position,
                ));
                return resolution;
            }
        },
    };

    let chorded = apply_chords(base, &spec.chord, ctx, &mut resolution.diagnostics);

    for pitch in &chorded {
        if pitch.fixed {
            resolution.pitches.push(ResolvedPitch {
                offset: Some(pitch.offset),
                volume: settings.voice_volume(0) * pitch.gain,
                fixed: true,
            });
            continue;
        }
        for (voice, key) in settings.key.iter().enumerate() {
            resolution.pitches.push(ResolvedPitch {
                offset: Some(pitch.offset.saturating_add(key - key_root)),
                volume: settings.voice_volume(voice) * pitch.gain,
                fixed: false,
            });
        }
    }
    resolution.traced = chorded;
    resolution
}

fn apply_chords(
    base: Vec<TracedPitch>,
    letters: &str,
    ctx: &PitchContext,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<TracedPitch> {
    let mut current = base;
    for letter in letters.chars() {
        let Some(rules) = ctx.library.chord(letter) else {
            diagnostics.push(Diagnostic::at(
                DiagnosticKind::UnknownChord { chord: letter },
                ctx.position,
            ));
            continue;
        };
        match apply_chord(&current, letter, rules) {
            Ok((next, unused)) => {
                if !unused.is_empty() {
                    diagnostics.push(Diagnostic::at(
                        DiagnosticKind::UnusedNote {
                            chord: letter,
                            unused,
                        },
                        ctx.position,
                    ));
                }
                current = next;
            }
            // the letter is dropped and the list stays as it was
            Err(kind) => diagnostics.push(Diagnostic::at(kind, ctx.position)),
        }
    }
    current
}

/// Apply one chord letter. Returns the new list and the indices no rule covered.
fn apply_chord(
    current: &[TracedPitch],
    letter: char,
    rules: &[ChordRule],
) -> Result<(Vec<TracedPitch>, Vec<usize>), DiagnosticKind> {
    let length = current.len() as i32;
    let mut covered = vec![false; current.len()];
    let mut next = Vec::new();

    for rule in rules {
        let head = normalize_index(rule.head, length, letter)?;
        let tail = normalize_index(rule.tail, length, letter)?;
        if head > tail {
            continue;
        }
        for (i, pitch) in current.iter().enumerate().take(tail + 1).skip(head) {
            if pitch.fixed {
                return Err(DiagnosticKind::OnFixedNote { chord: letter });
            }
            covered[i] = true;
            next.push(TracedPitch {
                offset: pitch.offset.saturating_add(rule.delta),
                ..*pitch
            });
        }
    }

    let unused = covered
        .iter()
        .enumerate()
        .filter(|(_, &c)| !c)
        .map(|(i, _)| i)
        .collect();
    Ok((next, unused))
}

fn normalize_index(index: i32, length: i32, letter: char) -> Result<usize, DiagnosticKind> {
    if index < 0 {
        if index < -length {
            return Err(DiagnosticKind::ChordRange {
                chord: letter,
                expected: -length,
                actual: index,
            });
        }
        Ok((index + length) as usize)
    } else if index >= length {
        Err(DiagnosticKind::ChordRange {
            chord: letter,
            expected: length - 1,
            actual: index,
        })
    } else {
        Ok(index as usize)
    }
}
