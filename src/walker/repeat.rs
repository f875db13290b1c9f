//! Repeat expansion for subtrack content.
//!
//! A positive repeat count plays the content once per pass with volta
//! selection: a volta bar line and everything up to the next volta only play
//! on the passes listed in its order. A zero or negative count `-n` plays the
//! content `n` times (once for `-1`); a coda marker cuts the last pass short.

use std::collections::BTreeSet;

use crate::diagnostic::{Diagnostic, DiagnosticKind, Position};
use crate::token::{BarLine, Token};

/// Expand `content` for `repeat`. The input tokens are never modified.
pub fn expand(content: &[Token], repeat: i32) -> (Vec<Token>, Vec<Diagnostic>) {
    if repeat > 0 {
        expand_voltas(content, repeat as u32)
    } else {
        expand_coda(content, repeat)
    }
}

fn at(kind: DiagnosticKind, index: usize) -> Diagnostic {
    Diagnostic::at(kind, Position { bar: 0, index })
}

/// Volta order of the token at each index, `None` for tokens that always play.
fn volta_orders(content: &[Token], repeat: u32) -> Vec<Option<Vec<u32>>> {
    let mut orders: Vec<Option<Vec<u32>>> = content
        .iter()
        .map(|token| match token {
            Token::BarLine(bar) if bar.is_volta() => Some(bar.order.clone().unwrap_or_default()),
            _ => None,
        })
        .collect();

    let claimed: BTreeSet<u32> = orders.iter().flatten().flatten().copied().collect();
    let default = orders
        .iter_mut()
        .flatten()
        .find(|order| order.is_empty());
    if let Some(order) = default {
        order.extend((1..=repeat).filter(|i| !claimed.contains(i)));
    }
    orders
}

fn expand_voltas(content: &[Token], repeat: u32) -> (Vec<Token>, Vec<Diagnostic>) {
    let diagnostics = content
        .iter()
        .enumerate()
        .filter(|(_, token)| token.is_coda())
        .map(|(index, _)| at(DiagnosticKind::UnexpectedCoda, index))
        .collect();

    let orders = volta_orders(content, repeat);
    let mut tokens = Vec::new();
    for pass in 1..=repeat {
        let mut skip = false;
        for (token, order) in content.iter().zip(&orders) {
            match order {
                None if skip => {}
                None => tokens.push(token.clone()),
                Some(order) if order.contains(&pass) => {
                    skip = false;
                    tokens.push(token.clone());
                }
                Some(_) => skip = true,
            }
        }
        tokens.push(Token::bar_line());
    }
    (tokens, diagnostics)
}

fn expand_coda(content: &[Token], repeat: i32) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    for (index, token) in content.iter().enumerate() {
        // only a bare `[0]` means "every pass" here
        let Token::BarLine(BarLine {
            order: Some(order), ..
        }) = token
        else {
            continue;
        };
        if order.as_slice() != [0] {
            diagnostics.push(at(
                DiagnosticKind::UnexpectedVolta {
                    order: order.clone(),
                },
                index,
            ));
        }
    }

    let mut body = content.to_vec();
    if repeat == -1 && body.last().is_some_and(|token| !token.is_bar_line()) {
        body.push(Token::bar_line());
    }

    let coda = body.iter().position(Token::is_coda);
    if let Some(first) = coda {
        for (index, token) in body.iter().enumerate().skip(first + 1) {
            if token.is_coda() {
                diagnostics.push(at(DiagnosticKind::MultiCoda, index));
            }
        }
    }

    let passes = repeat.unsigned_abs() as usize;
    let mut tokens = Vec::new();
    match coda {
        Some(cut) if passes > 0 => {
            for _ in 1..passes {
                tokens.extend_from_slice(&body);
            }
            tokens.extend_from_slice(&body[..cut]);
        }
        _ => {
            for _ in 0..passes {
                tokens.extend_from_slice(&body);
            }
        }
    }
    (tokens, diagnostics)
}
