//! Functions every default library starts with.
//!
//! | name | arguments | effect |
//! |------|-----------|--------|
//! | `Key` | list or number | replace the key |
//! | `Oct` | number | shift every key entry by 12 semitones per octave |
//! | `Speed` `Bar` `Beat` `Accent` `Light` `Trace` `Dur` `FadeIn` `FadeOut` `Rev` | number | set that setting |
//! | `Volume` `Stac` | list or number | replace that table; `Stac(r, i)` sets one entry |
//! | `Tuplet` | number, track | play `n` notes in the time of the next lower power of two |
//! | `Transpose` | number, track | play the track shifted by `n` semitones |

use std::cmp::Ordering;

use crate::error::WalkError;
use crate::settings::{check_key, SettingsOverride};
use crate::token::SubtrackToken;
use crate::walker::SubtrackResult;

use super::{ArgValue, FunctionApi, FunctionRegistry, Protocol};

const SCALARS: [(&str, &str); 10] = [
    ("Speed", "speed"),
    ("Bar", "bar"),
    ("Beat", "beat"),
    ("Accent", "accent"),
    ("Light", "light"),
    ("Trace", "trace"),
    ("Dur", "duration"),
    ("FadeIn", "fade-in"),
    ("FadeOut", "fade-out"),
    ("Rev", "rev"),
];

pub fn register(registry: &mut FunctionRegistry) {
    for (name, setting) in SCALARS {
        registry.register(name, Protocol::Default, move |api, args| {
            let value = number(api, args, 0)?;
            api.settings_mut().set_scalar(setting, value)?;
            Ok(None)
        });
    }

    registry.register("Key", Protocol::Default, |api, args| {
        let key = list(api, args, 0)?
            .into_iter()
            .map(|v| v.round() as i32)
            .collect();
        api.settings_mut().set_key(key)?;
        Ok(None)
    });

    registry.register("Oct", Protocol::Default, |api, args| {
        let octaves = integer(api, args, 0)?;
        let shift = octaves
            .checked_mul(12)
            .ok_or_else(|| WalkError::argument(api.name(), "octave shift out of range"))?;
        let key = shifted_key(api, shift)?;
        api.settings_mut().set_key(key)?;
        Ok(None)
    });

    registry.register("Volume", Protocol::Default, |api, args| {
        let volume = list(api, args, 0)?;
        api.settings_mut().set_volume(volume)?;
        Ok(None)
    });

    registry.register("Stac", Protocol::Default, stac);

    registry.register("Tuplet", Protocol::Default, |api, args| {
        let count = number(api, args, 0)?;
        if count <= 0.0 {
            return Err(WalkError::argument(api.name(), "tuplet count must be positive"));
        }
        let content = track(api, args, 1)?;
        let scale = count.log2() - count.log2().floor();
        let overrides = SettingsOverride {
            duration: Some(api.settings().duration + scale),
            ..SettingsOverride::default()
        };
        api.parse_track(&content, &overrides, Protocol::Default).map(Some)
    });

    registry.register("Transpose", Protocol::Default, |api, args| {
        let shift = integer(api, args, 0)?;
        let content = track(api, args, 1)?;
        let overrides = SettingsOverride {
            key: Some(shifted_key(api, shift)?),
            ..SettingsOverride::default()
        };
        api.parse_track(&content, &overrides, Protocol::Default).map(Some)
    });
}

/// `Stac(list)` replaces the table; `Stac(r)` or `Stac(r, i)` sets entry `i`
/// (default 1). Setting the entry just past the end appends it.
fn stac(
    api: &mut FunctionApi<'_, '_>,
    args: &[ArgValue],
) -> Result<Option<SubtrackResult>, WalkError> {
    if let Some(ArgValue::List(table)) = args.first() {
        api.settings_mut().set_stac(table.clone())?;
        return Ok(None);
    }
    let ratio = number(api, args, 0)?;
    let index = if args.len() > 1 {
        integer(api, args, 1)?
    } else {
        1
    };
    let index = usize::try_from(index)
        .map_err(|_| WalkError::argument(api.name(), "staccato index must not be negative"))?;
    let mut table = api.settings().stac.clone();
    match index.cmp(&table.len()) {
        Ordering::Less => table[index] = ratio,
        Ordering::Equal => table.push(ratio),
        Ordering::Greater => {
            return Err(WalkError::argument(
                api.name(),
                format!("staccato index {} is past the end of the table", index),
            ))
        }
    }
    api.settings_mut().set_stac(table)?;
    Ok(None)
}

/// The caller's key moved by `shift` semitones, kept within the key range.
fn shifted_key(api: &FunctionApi<'_, '_>, shift: i32) -> Result<Vec<i32>, WalkError> {
    let key = api
        .settings()
        .key
        .iter()
        .map(|k| k.checked_add(shift))
        .collect::<Option<Vec<i32>>>()
        .ok_or_else(|| WalkError::argument(api.name(), "key shift out of range"))?;
    check_key(&key)?;
    Ok(key)
}

fn arg<'v>(api: &FunctionApi<'_, '_>, args: &'v [ArgValue], index: usize) -> Result<&'v ArgValue, WalkError> {
    args.get(index)
        .ok_or_else(|| WalkError::argument(api.name(), format!("missing argument {}", index + 1)))
}

fn number(api: &FunctionApi<'_, '_>, args: &[ArgValue], index: usize) -> Result<f64, WalkError> {
    arg(api, args, index)?
        .as_number()
        .filter(|n| n.is_finite())
        .ok_or_else(|| WalkError::argument(api.name(), format!("argument {} must be a number", index + 1)))
}

fn integer(api: &FunctionApi<'_, '_>, args: &[ArgValue], index: usize) -> Result<i32, WalkError> {
    let value = number(api, args, index)?;
    if value.fract() != 0.0 || value.abs() > f64::from(i32::MAX) {
        return Err(WalkError::argument(
            api.name(),
            format!("argument {} must be a whole number", index + 1),
        ));
    }
    Ok(value as i32)
}

fn list(api: &FunctionApi<'_, '_>, args: &[ArgValue], index: usize) -> Result<Vec<f64>, WalkError> {
    arg(api, args, index)?
        .as_list()
        .filter(|values| values.iter().all(|v| v.is_finite()))
        .ok_or_else(|| WalkError::argument(api.name(), format!("argument {} must be a list", index + 1)))
}

fn track(
    api: &FunctionApi<'_, '_>,
    args: &[ArgValue],
    index: usize,
) -> Result<SubtrackToken, WalkError> {
    arg(api, args, index)?
        .as_track()
        .cloned()
        .ok_or_else(|| WalkError::argument(api.name(), format!("argument {} must be a track", index + 1)))
}
