//! Non-fatal diagnostics.
//!
//! A diagnostic never stops a walk. It carries where it happened (a stack of
//! bar/token positions, outermost first, one entry per nesting level) and typed
//! arguments describing what was expected and what was found.

use serde::Serialize;

/// Location of a token inside one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub bar: usize,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// `%` with fewer recorded notes than the trace depth.
    NoPrevious { expected: usize, actual: usize },
    /// Two pitches of one note resolved to the same offset.
    Reduplicate { actual: Vec<i32> },
    /// Some volume exceeded 1.0 and was clipped.
    VolumeLimit { actual: Vec<f64> },
    /// A chord rule index fell outside the pitch list.
    ChordRange { chord: char, expected: i32, actual: i32 },
    /// A chord rule tried to copy a fixed pitch.
    OnFixedNote { chord: char },
    /// A chord left some pitches of the list unused.
    UnusedNote { chord: char, unused: Vec<usize> },
    UnknownChord { chord: char },
    UnknownPitch { name: String },
    /// A bar closed with the wrong number of beats.
    BarLength { expected: f64, actual: f64, time: f64 },
    /// A coda marker inside a positively repeated subtrack.
    UnexpectedCoda,
    /// A volta marker inside a subtrack without a positive repeat count.
    UnexpectedVolta { order: Vec<u32> },
    /// More than one coda marker in one subtrack.
    MultiCoda,
    /// A fade longer than the track itself.
    FadeOverLong { actual: f64, duration: f64 },
    UnknownInstrument { name: String },
    UnknownFunction { name: String },
    /// A named track reached again while it is still being walked.
    RecursiveTrack { name: String },
    BadExpression { source: String, message: String },
    /// Reported by a function body.
    Function { name: String, message: String },
    /// Tracks of one section ended at different times.
    DiffDuration { expected: f64, actual: Vec<f64> },
}

impl DiagnosticKind {
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::NoPrevious { .. } => "NoPrevious",
            DiagnosticKind::Reduplicate { .. } => "Reduplicate",
            DiagnosticKind::VolumeLimit { .. } => "VolumeLimit",
            DiagnosticKind::ChordRange { .. } => "ChordRange",
            DiagnosticKind::OnFixedNote { .. } => "OnFixedNote",
            DiagnosticKind::UnusedNote { .. } => "UnusedNote",
            DiagnosticKind::UnknownChord { .. } => "UnknownChord",
            DiagnosticKind::UnknownPitch { .. } => "UnknownPitch",
            DiagnosticKind::BarLength { .. } => "BarLength",
            DiagnosticKind::UnexpectedCoda => "UnexpectedCoda",
            DiagnosticKind::UnexpectedVolta { .. } => "UnexpectedVolta",
            DiagnosticKind::MultiCoda => "MultiCoda",
            DiagnosticKind::FadeOverLong { .. } => "FadeOverLong",
            DiagnosticKind::UnknownInstrument { .. } => "UnknownInstrument",
            DiagnosticKind::UnknownFunction { .. } => "UnknownFunction",
            DiagnosticKind::RecursiveTrack { .. } => "RecursiveTrack",
            DiagnosticKind::BadExpression { .. } => "BadExpression",
            DiagnosticKind::Function { .. } => "Function",
            DiagnosticKind::DiffDuration { .. } => "DiffDuration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Outermost scope first; empty for track- or section-level diagnostics.
    pub position: Vec<Position>,
}

impl Diagnostic {
    pub fn at(kind: DiagnosticKind, position: Position) -> Self {
        log::trace!("{} at bar {}, token {}", kind.name(), position.bar, position.index);
        Self {
            kind,
            position: vec![position],
        }
    }

    /// A diagnostic about a whole track or section.
    pub fn unlocated(kind: DiagnosticKind) -> Self {
        log::trace!("{}", kind.name());
        Self {
            kind,
            position: Vec::new(),
        }
    }

    /// Record the enclosing scope's position when bubbling out of a nested walk.
    pub fn nest(mut self, outer: Position) -> Self {
        self.position.insert(0, outer);
        self
    }

    /// Move a timed diagnostic `offset` seconds later, for merging a nested
    /// walk whose clock started at zero.
    pub fn delay(mut self, offset: f64) -> Self {
        if let DiagnosticKind::BarLength { time, .. } = &mut self.kind {
            *time += offset;
        }
        self
    }

    /// Position within the innermost scope.
    pub fn innermost(&self) -> Option<Position> {
        self.position.last().copied()
    }

    pub fn is(&self, name: &str) -> bool {
        self.kind.name() == name
    }
}
