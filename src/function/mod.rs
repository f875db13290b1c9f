//! # Function Module
//!
//! Named functions invoked from function tokens.
//!
//! A function is plain Rust registered on the [`FunctionRegistry`] with a
//! [`Protocol`]. It receives evaluated arguments and a [`FunctionApi`] that
//! exposes only what the protocol allows: the settings of the calling scope,
//! the trace queue, nested walks and diagnostics.
//!
//! Returning `Some(result)` splices a nested walk into the caller as if its
//! tokens had been written in place; `None` means the function only changed
//! settings or state.
//!
//! ## Sub-modules
//! - `builtins` - setting setters, `Tuplet` and `Transpose`

pub mod builtins;

use std::collections::HashMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::WalkError;
use crate::expr::{self, ExprError};
use crate::settings::{Settings, SettingsOverride};
use crate::state::{RunningState, SharedState, TraceEntry};
use crate::token::{Arg, SubtrackToken, Token};
use crate::walker::{expand, SubtrackResult, SubtrackWalker};

/// What a function may touch in the walk that calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Full access to the shared trace queue.
    #[default]
    Default,
    /// The trace queue can be read; appends made by nested walks are discarded.
    ReadOnly,
    /// Nested walks start from an empty trace queue; the caller's is restored
    /// afterwards.
    Isolated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub read_trace: bool,
    pub write_trace: bool,
}

impl Protocol {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Protocol::Default => Capabilities {
                read_trace: true,
                write_trace: true,
            },
            Protocol::ReadOnly => Capabilities {
                read_trace: true,
                write_trace: false,
            },
            Protocol::Isolated => Capabilities {
                read_trace: false,
                write_trace: false,
            },
        }
    }
}

/// An evaluated function argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Number(f64),
    Text(String),
    List(Vec<f64>),
    Track(SubtrackToken),
}

impl ArgValue {
    /// Evaluate a written argument. Expression failures return the source text
    /// with the error.
    pub fn from_arg(arg: &Arg) -> Result<Self, (String, ExprError)> {
        Ok(match arg {
            Arg::Number(n) => ArgValue::Number(*n),
            Arg::String(s) => ArgValue::Text(s.clone()),
            Arg::Array(values) => ArgValue::List(values.clone()),
            Arg::Expression(source) => {
                ArgValue::Number(expr::evaluate(source).map_err(|e| (source.clone(), e))?)
            }
            Arg::Token(token) => match token.as_ref() {
                Token::Subtrack(subtrack) => ArgValue::Track(subtrack.clone()),
                other => ArgValue::Track(SubtrackToken::new(vec![other.clone()])),
            },
        })
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// A list, or a single number as a one-element list.
    pub fn as_list(&self) -> Option<Vec<f64>> {
        match self {
            ArgValue::Number(n) => Some(vec![*n]),
            ArgValue::List(values) => Some(values.clone()),
            _ => None,
        }
    }

    pub fn as_track(&self) -> Option<&SubtrackToken> {
        match self {
            ArgValue::Track(track) => Some(track),
            _ => None,
        }
    }
}

pub type FunctionBody =
    Box<dyn Fn(&mut FunctionApi<'_, '_>, &[ArgValue]) -> Result<Option<SubtrackResult>, WalkError>>;

pub struct FunctionDef {
    pub protocol: Protocol,
    pub body: FunctionBody,
}

#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Register `body` under `name`, replacing any earlier definition.
    pub fn register<F>(&mut self, name: &str, protocol: Protocol, body: F)
    where
        F: Fn(&mut FunctionApi<'_, '_>, &[ArgValue]) -> Result<Option<SubtrackResult>, WalkError>
            + 'static,
    {
        self.functions.insert(
            name.to_string(),
            FunctionDef {
                protocol,
                body: Box::new(body),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// The view of the calling walk a function body works through.
pub struct FunctionApi<'w, 'a> {
    name: &'w str,
    capabilities: Capabilities,
    walker: &'w mut SubtrackWalker<'a>,
    shared: &'w mut SharedState,
}

impl<'w, 'a> FunctionApi<'w, 'a> {
    pub(crate) fn new(
        name: &'w str,
        protocol: Protocol,
        walker: &'w mut SubtrackWalker<'a>,
        shared: &'w mut SharedState,
    ) -> Self {
        Self {
            name,
            capabilities: protocol.capabilities(),
            walker,
            shared,
        }
    }

    /// Name the function was called by.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.walker.settings
    }

    /// Settings of the calling scope. Changes stay in that scope.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.walker.settings
    }

    /// Counters of the calling walk.
    pub fn meta(&self) -> &RunningState {
        &self.walker.state
    }

    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.capabilities
            .read_trace
            .then_some(self.shared.trace.as_slice())
    }

    pub fn trace_mut(&mut self) -> Option<&mut Vec<TraceEntry>> {
        if self.capabilities.write_trace {
            Some(&mut self.shared.trace)
        } else {
            None
        }
    }

    /// Record a diagnostic against the function token.
    pub fn report(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::at(
            DiagnosticKind::Function {
                name: self.name.to_string(),
                message: message.into(),
            },
            self.walker.position(),
        );
        self.walker.diagnostics.push(diagnostic);
    }

    /// Walk `track` nested, with `overrides` applied to a copy of the caller's
    /// settings.
    ///
    /// A plain track (repeat `-1`) is walked exactly as written; any other
    /// repeat count is expanded first. Ties are always shared with the caller;
    /// `protocol` decides what happens to the trace queue.
    pub fn parse_track(
        &mut self,
        track: &SubtrackToken,
        overrides: &SettingsOverride,
        protocol: Protocol,
    ) -> Result<SubtrackResult, WalkError> {
        let settings = self.walker.settings.extend_with(overrides);
        let (tokens, diagnostics) = if track.repeat == -1 {
            (track.content.clone(), Vec::new())
        } else {
            expand(&track.content, track.repeat)
        };

        let capabilities = protocol.capabilities();
        let saved = if capabilities.read_trace {
            None
        } else {
            Some(std::mem::take(&mut self.shared.trace))
        };
        let mark = self.shared.trace.len();

        let result = self
            .walker
            .nested_walk(&tokens, settings, diagnostics, self.shared);

        if !capabilities.write_trace {
            self.shared.trace.truncate(mark);
        }
        if let Some(trace) = saved {
            self.shared.trace = trace;
        }
        result
    }

    /// Concatenate nested results as if they had been walked one after another.
    pub fn join(&mut self, results: Vec<SubtrackResult>) -> SubtrackResult {
        let mut joined = SubtrackWalker::new(
            self.walker.library,
            self.walker.dict,
            self.walker.settings.extend(),
            self.shared,
            true,
        );
        let mut trace = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            joined.state.index = index;
            trace.extend(result.state.trace.iter().cloned());
            joined.merge(result, self.shared);
        }
        let mut result = joined.finish(self.shared);
        result.state.trace = trace;
        result
    }
}
