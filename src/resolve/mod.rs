//! # Resolve Module
//!
//! Turns one note token into timed events.
//!
//! ## Sub-modules
//! - `pitch` - one pitch spec to concrete offsets and volumes
//! - `note` - duration operators, ties and trace bookkeeping for a whole note
//!
//! ## Pitch System
//!
//! Scale degrees map to semitones `{1:0, 2:2, 3:4, 4:5, 5:7, 6:9, 7:11}` on top
//! of the key. A key with several entries plays every pitch once per voice,
//! voice `v` offset by `key[v] - key[0]`. Pitch operators (`#` `b` `'` `,`)
//! shift non-fixed pitches; volume operators (`>` `:`) scale every pitch.
//!
//! Named macros from the instrument dictionary are fixed constants unless they
//! were written as scale degrees. Fixed pitches ignore key and operators and
//! sound once regardless of the voice count.
//!
//! ## Chords
//!
//! Each chord letter rewrites the current pitch list by copying index ranges
//! with a semitone delta. Letters apply one after another. A letter that
//! indexes out of range or copies a fixed pitch is dropped with a diagnostic.
//!
//! ## Timing
//!
//! ```text
//! beat     = scan(duration ops) * 2^-Duration
//! nominal  = beat * 60 / Speed
//! actual   = nominal * (1 - Stac[staccato])
//! ```

mod note;
mod pitch;

#[cfg(test)]
mod tests;

pub use note::{beat_length, resolve_note, NoteContext, NoteOutcome};
pub use pitch::{resolve_pitch, PitchContext, PitchDict, PitchResolution, ResolvedPitch};
