//! Token dispatch, bar bookkeeping and subtrack merging.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Position};
use crate::error::WalkError;
use crate::function::{ArgValue, FunctionApi};
use crate::instruments;
use crate::library::Library;
use crate::resolve::{resolve_note, NoteContext, PitchDict};
use crate::settings::Settings;
use crate::state::{RunningState, SharedState};
use crate::token::{BarLine, FunctionToken, Instrument, SubtrackToken, Token};

use super::repeat::expand;
use super::types::{NotationBuckets, NotationMark, SubtrackResult, TrackResult};

const BAR_TOLERANCE: f64 = 1e-7;
const VOICE_TOLERANCE: f64 = 1e-10;

/// Walks one token sequence with its own counters and settings.
///
/// Trace queue, tie state and event store live in the [`SharedState`] passed
/// to [`walk`](Self::walk), so nested walks see and extend the same ones.
pub(crate) struct SubtrackWalker<'a> {
    pub(crate) library: &'a Library,
    pub(crate) dict: &'a PitchDict,
    pub(crate) settings: Settings,
    pub(crate) state: RunningState,
    pub(crate) diagnostics: Vec<Diagnostic>,
    events: Vec<usize>,
    notation: NotationBuckets,
    /// Length of the shared trace queue when this walk started.
    trace_offset: usize,
    /// Nested walks leave their first bar to be checked by the parent.
    nested: bool,
}

impl<'a> SubtrackWalker<'a> {
    pub(crate) fn new(
        library: &'a Library,
        dict: &'a PitchDict,
        settings: Settings,
        shared: &SharedState,
        nested: bool,
    ) -> Self {
        let notation = library
            .notation_classes()
            .iter()
            .map(|class| (class.clone(), Vec::new()))
            .collect();
        Self {
            library,
            dict,
            settings,
            state: RunningState::default(),
            diagnostics: Vec::new(),
            events: Vec::new(),
            notation,
            trace_offset: shared.trace.len(),
            nested,
        }
    }

    pub(crate) fn position(&self) -> Position {
        Position {
            bar: self.state.bar_count,
            index: self.state.index,
        }
    }

    fn report(&mut self, kind: DiagnosticKind) {
        let diagnostic = Diagnostic::at(kind, self.position());
        self.diagnostics.push(diagnostic);
    }

    fn is_legal_bar(&self, beats: f64) -> bool {
        beats == 0.0 || (beats - self.settings.bar).abs() < BAR_TOLERANCE
    }

    pub(crate) fn walk(&mut self, tokens: &[Token], shared: &mut SharedState) -> Result<(), WalkError> {
        for (index, token) in tokens.iter().enumerate() {
            self.state.index = index;
            match token {
                Token::Note(note) => {
                    let ctx = NoteContext {
                        settings: &self.settings,
                        library: self.library,
                        dict: self.dict,
                        position: self.position(),
                    };
                    let outcome = resolve_note(note, &ctx, shared, &mut self.state);
                    self.state.add_beats(outcome.beat);
                    self.events.extend(outcome.events);
                    self.diagnostics.extend(outcome.diagnostics);
                }
                Token::Tie => shared.tie_left = true,
                Token::BarLine(bar) => self.close_bar(bar),
                Token::Subtrack(subtrack) => {
                    let nested = self.subtrack(subtrack, shared)?;
                    self.merge(nested, shared);
                }
                Token::Macrotrack { name } => {
                    let library = self.library;
                    let Some(content) = library.track(name) else {
                        log::warn!("undefined track '{}'", name);
                        return Err(WalkError::UndefinedTrack {
                            name: name.clone(),
                            bar: self.state.bar_count,
                            index,
                        });
                    };
                    if shared.active_tracks.contains(name) {
                        log::warn!("track '{}' references itself", name);
                        self.report(DiagnosticKind::RecursiveTrack { name: name.clone() });
                        continue;
                    }
                    shared.active_tracks.push(name.clone());
                    let nested = self.subtrack(&SubtrackToken::new(content.to_vec()), shared);
                    shared.active_tracks.pop();
                    self.merge(nested?, shared);
                }
                Token::Function(function) => {
                    if let Some(nested) = self.call(function, shared)? {
                        self.merge(nested, shared);
                    }
                }
                Token::Clef { .. } | Token::Comment { .. } | Token::Space => {}
                Token::Annotation { kind } => self.annotate(kind),
            }
        }
        Ok(())
    }

    fn close_bar(&mut self, bar: &BarLine) {
        let open = self.state.open_bar();
        if open != 0.0 {
            let first = self.state.bar_count == 0;
            if first {
                self.state.first_bar_time = self.state.duration;
            }
            self.state.bar_count += 1;
            let deferred = first && self.nested;
            if !deferred && !bar.terminal && !self.is_legal_bar(open) {
                self.report(DiagnosticKind::BarLength {
                    expected: self.settings.bar,
                    actual: open,
                    time: self.state.duration,
                });
            }
            self.state.bar_last = 0.0;
        }
        if bar.overlay {
            self.end_voice();
        }
    }

    /// Finish the current overlay voice and restart the clock for the next.
    fn end_voice(&mut self) {
        let state = &mut self.state;
        if state.duration != 0.0 || state.beat_count != 0.0 {
            state.voices.push(state.duration);
            state.voice_beats = state.voice_beats.max(state.beat_count);
        }
        state.duration = 0.0;
        state.beat_count = 0.0;
    }

    /// Once every overlay voice is done, the walk lasts as long as the longest.
    fn close_voices(&mut self) {
        if self.state.voices.is_empty() {
            return;
        }
        self.end_voice();
        let voices = std::mem::take(&mut self.state.voices);
        let longest = voices.iter().copied().fold(0.0, f64::max);
        if voices.iter().any(|d| (longest - d).abs() > VOICE_TOLERANCE) {
            self.report(DiagnosticKind::DiffDuration {
                expected: longest,
                actual: voices,
            });
        }
        self.state.duration = longest;
        self.state.beat_count = self.state.voice_beats;
        self.state.voice_beats = 0.0;
    }

    fn annotate(&mut self, kind: &str) {
        if let Some(spec) = self.library.annotation(kind) {
            if spec.preserve {
                let mark = NotationMark {
                    kind: kind.to_string(),
                    bar: self.state.bar_count,
                    index: self.state.index,
                    time: self.state.duration,
                };
                self.notation.entry(spec.class.clone()).or_default().push(mark);
            }
        }
        self.state.after.insert(kind.to_string());
    }

    /// Walk an inline subtrack: expand its repeats, then walk the result nested.
    pub(crate) fn subtrack(
        &self,
        subtrack: &SubtrackToken,
        shared: &mut SharedState,
    ) -> Result<SubtrackResult, WalkError> {
        let (tokens, diagnostics) = expand(&subtrack.content, subtrack.repeat);
        self.nested_walk(&tokens, self.settings.extend(), diagnostics, shared)
    }

    pub(crate) fn nested_walk(
        &self,
        tokens: &[Token],
        settings: Settings,
        diagnostics: Vec<Diagnostic>,
        shared: &mut SharedState,
    ) -> Result<SubtrackResult, WalkError> {
        let mut walker = SubtrackWalker::new(self.library, self.dict, settings, shared, true);
        walker.diagnostics = diagnostics;
        walker.walk(tokens, shared)?;
        Ok(walker.finish(shared))
    }

    fn call(
        &mut self,
        function: &FunctionToken,
        shared: &mut SharedState,
    ) -> Result<Option<SubtrackResult>, WalkError> {
        let library = self.library;
        let Some(def) = library.functions.get(&function.name) else {
            self.report(DiagnosticKind::UnknownFunction {
                name: function.name.clone(),
            });
            return Ok(None);
        };

        let mut args = Vec::with_capacity(function.args.len());
        for arg in &function.args {
            match ArgValue::from_arg(arg) {
                Ok(value) => args.push(value),
                Err((source, err)) => {
                    self.report(DiagnosticKind::BadExpression {
                        source,
                        message: err.to_string(),
                    });
                    return Ok(None);
                }
            }
        }

        let result = {
            let mut api = FunctionApi::new(&function.name, def.protocol, self, shared);
            (def.body)(&mut api, &args)
        };
        match result {
            Ok(nested) => Ok(nested),
            Err(err @ (WalkError::Settings { .. } | WalkError::Argument { .. })) => {
                self.report(DiagnosticKind::Function {
                    name: function.name.clone(),
                    message: err.to_string(),
                });
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Fold a finished nested walk into this one, as if its tokens had been
    /// walked in place.
    pub(crate) fn merge(&mut self, nested: SubtrackResult, shared: &mut SharedState) {
        let position = self.position();
        let time = self.state.duration;
        let beats = self.state.beat_count;
        shared.shift_events(&nested.events, time, beats);

        let inner = &nested.state;
        if inner.bar_count == 0 {
            self.state.add_beats(inner.bar_first);
        } else {
            let first = self.state.bar_count == 0;
            let combined = self.state.open_bar() + inner.bar_first;
            let closed_at = time + inner.first_bar_time;
            let check = !(first && self.nested);
            if first {
                self.state.bar_first = combined;
                self.state.first_bar_time = closed_at;
            }
            self.state.bar_count += 1;
            if check && !self.is_legal_bar(combined) {
                self.report(DiagnosticKind::BarLength {
                    expected: self.settings.bar,
                    actual: combined,
                    time: closed_at,
                });
            }
            self.state.bar_count += inner.bar_count - 1;
            self.state.bar_last = inner.bar_last;
        }

        self.state.duration += inner.duration;
        self.state.beat_count += inner.beat_count;
        self.state.after.extend(inner.after.iter().cloned());
        self.events.extend_from_slice(&nested.events);
        self.diagnostics.extend(
            nested
                .diagnostics
                .iter()
                .cloned()
                .map(|d| d.nest(position).delay(time)),
        );
        for (class, marks) in &nested.notation {
            let bucket = self.notation.entry(class.clone()).or_default();
            bucket.extend(marks.iter().map(|mark| NotationMark {
                time: mark.time + time,
                ..mark.clone()
            }));
        }
        self.library.plugins.on_merge(&mut self.notation, &nested);
    }

    /// Package this walk's output. The trace slice is what this walk appended.
    pub(crate) fn finish(mut self, shared: &SharedState) -> SubtrackResult {
        self.close_voices();
        self.state.trace = shared
            .trace
            .get(self.trace_offset..)
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        self.state.tie_left = shared.tie_left;
        SubtrackResult {
            events: self.events,
            notation: self.notation,
            diagnostics: self.diagnostics,
            state: self.state,
        }
    }
}

/// Walks one track for one instrument.
pub struct TrackWalker<'a> {
    library: &'a Library,
    settings: &'a Settings,
    instrument: &'a Instrument,
    dict: PitchDict,
    id: String,
    /// Name the track is registered under, if any.
    name: Option<String>,
}

impl<'a> TrackWalker<'a> {
    pub fn new(library: &'a Library, settings: &'a Settings, instrument: &'a Instrument, id: String) -> Self {
        Self {
            library,
            settings,
            instrument,
            dict: PitchDict::from_macros(&instrument.dict),
            id,
            name: None,
        }
    }

    /// Mark the walked content as the named track `name`, so a reference back
    /// to it is caught as recursion.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Walk `content` with the instrument's spec tokens in front.
    pub fn walk(&self, content: &[Token]) -> Result<TrackResult, WalkError> {
        log::debug!("walking track {}", self.id);
        let tokens: Vec<Token> = self
            .instrument
            .spec
            .iter()
            .chain(content)
            .cloned()
            .collect();

        let mut shared = SharedState::new();
        shared.active_tracks.extend(self.name.iter().cloned());
        let mut walker = SubtrackWalker::new(self.library, &self.dict, self.settings.extend(), &shared, false);
        if let Err(err) = walker.walk(&tokens, &mut shared) {
            log::warn!("track {} aborted: {}", self.id, err);
            return Err(err);
        }
        let settings = walker.settings.clone();
        let mut result = walker.finish(&shared);
        drop_trailing_bar_length(&mut result);

        let duration = result.duration();
        for fade in [settings.fade_in, settings.fade_out] {
            if duration < fade {
                result.diagnostics.push(Diagnostic::unlocated(DiagnosticKind::FadeOverLong {
                    actual: fade,
                    duration,
                }));
            }
        }
        let name = &self.instrument.name;
        if !instruments::is_instrument(name) && !instruments::is_percussion(name) {
            result.diagnostics.push(Diagnostic::unlocated(DiagnosticKind::UnknownInstrument {
                name: name.clone(),
            }));
        }

        let mut track = TrackResult {
            id: self.id.clone(),
            instrument: name.clone(),
            events: shared.collect_events(&result.events),
            notation: result.notation,
            diagnostics: result.diagnostics,
            state: result.state,
            effects: settings.effects(),
        };
        self.library.plugins.track_epilogue(&mut track);
        log::debug!(
            "track {} done: {} events, {} diagnostics",
            track.id,
            track.events.len(),
            track.diagnostics.len()
        );
        Ok(track)
    }
}

/// A track may end mid-bar: forget the complaint about a short bar that
/// closed exactly where the track ends, however deeply it was nested.
fn drop_trailing_bar_length(result: &mut SubtrackResult) {
    let duration = result.state.duration;
    let last = result.diagnostics.iter().rposition(|d| match d.kind {
        DiagnosticKind::BarLength {
            expected,
            actual,
            time,
        } => (time - duration).abs() < BAR_TOLERANCE && actual < expected,
        _ => false,
    });
    if let Some(index) = last {
        result.diagnostics.remove(index);
    }
}
