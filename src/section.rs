//! Section driver: settings functions, named tracks and one walk per
//! (track, instrument).

use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::WalkError;
use crate::library::Library;
use crate::resolve::PitchDict;
use crate::settings::Settings;
use crate::state::SharedState;
use crate::token::{Document, FunctionToken, Instrument, Token};
use crate::walker::{SubtrackWalker, TrackResult, TrackWalker};

const DURATION_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub tracks: Vec<TrackResult>,
    /// Section-level diagnostics: settings functions and duration mismatches.
    pub diagnostics: Vec<Diagnostic>,
    /// Settings the section's tracks started from.
    pub settings: Settings,
}

impl SectionResult {
    pub fn track(&self, id: &str) -> Option<&TrackResult> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// Compile every section of `document`.
///
/// Global settings persist from one section to the next; named tracks are
/// registered on `library` in document order, so a track can only reference
/// tracks defined before it or in an earlier section.
///
/// # Errors
/// Returns [`WalkError::UndefinedTrack`] if any walk references a track name
/// that has not been defined. No partial result is returned.
pub fn compile(document: &Document, library: &mut Library) -> Result<Vec<SectionResult>, WalkError> {
    let mut global = Settings::default();
    library.plugins.global_setup(&mut global);

    let mut sections = Vec::new();
    for (number, section) in document.sections.iter().enumerate() {
        log::debug!("section {}: {} tracks", number, section.tracks.len());
        let mut diagnostics = Vec::new();
        global = apply_functions(library, global, &section.prolog, &mut diagnostics)?;
        let settings = apply_functions(library, global.extend(), &section.settings, &mut diagnostics)?;

        let mut tracks = Vec::new();
        let mut instrument_count: HashMap<String, usize> = HashMap::new();
        for def in &section.tracks {
            if let Some(name) = &def.name {
                library.define_track(name, def.content.clone());
            }
            if !def.play {
                continue;
            }
            let default_instrument = [Instrument::default()];
            let instruments: &[Instrument] = if def.instruments.is_empty() {
                &default_instrument
            } else {
                &def.instruments
            };
            for instrument in instruments {
                let count = instrument_count.entry(instrument.name.clone()).or_insert(0);
                *count += 1;
                let id = if def.id.is_empty() {
                    format!("{}#{}", instrument.name, count)
                } else {
                    format!("{}#{}", def.id, instrument.name)
                };
                let mut walker = TrackWalker::new(library, &settings, instrument, id);
                if let Some(name) = &def.name {
                    walker = walker.named(name);
                }
                tracks.push(walker.walk(&def.content)?);
            }
        }

        if tracks.is_empty() {
            log::debug!("section {} has no playable tracks", number);
            continue;
        }
        if let Some(diagnostic) = check_durations(&tracks) {
            diagnostics.push(diagnostic);
        }
        sections.push(SectionResult {
            tracks,
            diagnostics,
            settings,
        });
    }
    Ok(sections)
}

/// Run settings functions against `settings` and return the changed copy.
fn apply_functions(
    library: &Library,
    settings: Settings,
    functions: &[FunctionToken],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Settings, WalkError> {
    if functions.is_empty() {
        return Ok(settings);
    }
    let tokens: Vec<Token> = functions.iter().cloned().map(Token::Function).collect();
    let dict = PitchDict::default();
    let mut shared = SharedState::new();
    let mut walker = SubtrackWalker::new(library, &dict, settings, &shared, false);
    walker.walk(&tokens, &mut shared)?;
    diagnostics.append(&mut walker.diagnostics);
    Ok(walker.settings)
}

fn check_durations(tracks: &[TrackResult]) -> Option<Diagnostic> {
    let durations: Vec<f64> = tracks.iter().map(TrackResult::duration).collect();
    let longest = durations.iter().copied().fold(f64::MIN, f64::max);
    if durations
        .iter()
        .all(|d| (d - longest).abs() < DURATION_TOLERANCE)
    {
        return None;
    }
    Some(Diagnostic::unlocated(DiagnosticKind::DiffDuration {
        expected: longest,
        actual: durations,
    }))
}
