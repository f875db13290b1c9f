//! # Settings
//!
//! The settings record every walk reads: key, volume table, bar length, speed,
//! staccato table, accent/light factors, trace depth, duration unit and the
//! rendering effects.
//!
//! Settings are copy-on-extend. A nested scope gets its own copy via
//! [`Settings::extend`] or [`Settings::extend_with`]; changes made in the nested
//! scope never reach the parent.
//!
//! ## YAML form
//! ```yaml
//! key: [0, 4, 7]
//! volume: [1.0, 0.6]
//! bar: 3
//! speed: 120
//! fade-in: 0.5
//! ```

use serde::{Deserialize, Serialize};

use crate::error::WalkError;

/// Largest key offset in semitones either way.
pub const KEY_LIMIT: i32 = 1200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// One semitone offset per voice.
    pub key: Vec<i32>,
    /// Base volume per voice; shorter than `key` means the last entry repeats.
    pub volume: Vec<f64>,
    /// Beats per bar.
    pub bar: f64,
    pub beat: f64,
    /// Beats per minute.
    pub speed: f64,
    /// Shortening fraction per staccato index.
    pub stac: Vec<f64>,
    pub accent: f64,
    pub light: f64,
    /// Lookback depth for `%`.
    pub trace: usize,
    /// Duration exponent: every beat length is scaled by `2^-duration`.
    pub duration: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub rev: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key: vec![0],
            volume: vec![1.0],
            bar: 4.0,
            beat: 4.0,
            speed: 60.0,
            stac: vec![0.0, 0.5, 0.75],
            accent: 2.0,
            light: 0.5,
            trace: 1,
            duration: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
            rev: 0.0,
        }
    }
}

/// Partial settings; present fields shadow the parent's.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SettingsOverride {
    pub key: Option<Vec<i32>>,
    pub volume: Option<Vec<f64>>,
    pub bar: Option<f64>,
    pub beat: Option<f64>,
    pub speed: Option<f64>,
    pub stac: Option<Vec<f64>>,
    pub accent: Option<f64>,
    pub light: Option<f64>,
    pub trace: Option<usize>,
    pub duration: Option<f64>,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
    pub rev: Option<f64>,
}

/// Effect parameters handed to the renderer alongside the events.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Effects {
    pub fade_in: f64,
    pub fade_out: f64,
    pub rev: f64,
}

impl Settings {
    /// Parse and validate settings from YAML.
    pub fn from_yaml(source: &str) -> Result<Self, WalkError> {
        let settings: Settings = serde_yaml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// A copy for a nested scope.
    pub fn extend(&self) -> Settings {
        self.clone()
    }

    /// A copy for a nested scope with `overrides` applied on top.
    pub fn extend_with(&self, overrides: &SettingsOverride) -> Settings {
        let mut settings = self.clone();
        if let Some(key) = &overrides.key {
            settings.key = key.clone();
        }
        if let Some(volume) = &overrides.volume {
            settings.volume = volume.clone();
        }
        if let Some(stac) = &overrides.stac {
            settings.stac = stac.clone();
        }
        settings.bar = overrides.bar.unwrap_or(settings.bar);
        settings.beat = overrides.beat.unwrap_or(settings.beat);
        settings.speed = overrides.speed.unwrap_or(settings.speed);
        settings.accent = overrides.accent.unwrap_or(settings.accent);
        settings.light = overrides.light.unwrap_or(settings.light);
        settings.trace = overrides.trace.unwrap_or(settings.trace);
        settings.duration = overrides.duration.unwrap_or(settings.duration);
        settings.fade_in = overrides.fade_in.unwrap_or(settings.fade_in);
        settings.fade_out = overrides.fade_out.unwrap_or(settings.fade_out);
        settings.rev = overrides.rev.unwrap_or(settings.rev);
        settings
    }

    pub fn validate(&self) -> Result<(), WalkError> {
        check_key(&self.key)?;
        check_list("volume", &self.volume, |v| (0.0..=1.0).contains(&v))?;
        check_list("stac", &self.stac, |v| (0.0..=1.0).contains(&v))?;
        check_value("bar", self.bar, |v| v > 0.0)?;
        check_value("beat", self.beat, |v| v > 0.0)?;
        check_value("speed", self.speed, |v| v > 0.0)?;
        check_value("accent", self.accent, |v| v > 0.0)?;
        check_value("light", self.light, |v| v > 0.0)?;
        check_value("duration", self.duration, f64::is_finite)?;
        check_value("fade-in", self.fade_in, |v| v >= 0.0)?;
        check_value("fade-out", self.fade_out, |v| v >= 0.0)?;
        check_value("rev", self.rev, |v| v >= 0.0)?;
        if self.trace == 0 {
            return Err(WalkError::setting("trace", "must be at least 1"));
        }
        Ok(())
    }

    pub fn set_key(&mut self, key: Vec<i32>) -> Result<(), WalkError> {
        check_key(&key)?;
        self.key = key;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: Vec<f64>) -> Result<(), WalkError> {
        check_list("volume", &volume, |v| (0.0..=1.0).contains(&v))?;
        self.volume = volume;
        Ok(())
    }

    pub fn set_stac(&mut self, stac: Vec<f64>) -> Result<(), WalkError> {
        check_list("stac", &stac, |v| (0.0..=1.0).contains(&v))?;
        self.stac = stac;
        Ok(())
    }

    /// Set one of the scalar settings by its YAML name.
    pub fn set_scalar(&mut self, name: &str, value: f64) -> Result<(), WalkError> {
        let (slot, valid) = match name {
            "bar" => (&mut self.bar, value > 0.0),
            "beat" => (&mut self.beat, value > 0.0),
            "speed" => (&mut self.speed, value > 0.0),
            "accent" => (&mut self.accent, value > 0.0),
            "light" => (&mut self.light, value > 0.0),
            "duration" => (&mut self.duration, value.is_finite()),
            "fade-in" => (&mut self.fade_in, value >= 0.0),
            "fade-out" => (&mut self.fade_out, value >= 0.0),
            "rev" => (&mut self.rev, value >= 0.0),
            "trace" => {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(WalkError::setting("trace", "must be a positive integer"));
                }
                self.trace = value as usize;
                return Ok(());
            }
            _ => return Err(WalkError::setting(name, "unknown setting")),
        };
        if !valid || value.is_nan() {
            return Err(WalkError::setting(name, format!("{} is out of range", value)));
        }
        *slot = value;
        Ok(())
    }

    /// Volume for voice `voice`, repeating the last table entry past its end.
    pub fn voice_volume(&self, voice: usize) -> f64 {
        self.volume
            .get(voice)
            .or_else(|| self.volume.last())
            .copied()
            .unwrap_or(1.0)
    }

    /// Shortening fraction for a staccato index; unknown indices don't shorten.
    pub fn staccato(&self, index: usize) -> f64 {
        self.stac.get(index).copied().unwrap_or(0.0)
    }

    pub fn effects(&self) -> Effects {
        Effects {
            fade_in: self.fade_in,
            fade_out: self.fade_out,
            rev: self.rev,
        }
    }
}

/// A key must be non-empty with every offset within [`KEY_LIMIT`].
pub fn check_key(key: &[i32]) -> Result<(), WalkError> {
    check_list("key", key, |k| (-KEY_LIMIT..=KEY_LIMIT).contains(&k))
}

fn check_list<T: Copy + std::fmt::Display>(
    key: &str,
    values: &[T],
    valid: impl Fn(T) -> bool,
) -> Result<(), WalkError> {
    if values.is_empty() {
        return Err(WalkError::setting(key, "must not be empty"));
    }
    match values.iter().find(|&&v| !valid(v)) {
        Some(v) => Err(WalkError::setting(key, format!("{} is out of range", v))),
        None => Ok(()),
    }
}

fn check_value(key: &str, value: f64, valid: impl Fn(f64) -> bool) -> Result<(), WalkError> {
    if value.is_nan() || !valid(value) {
        return Err(WalkError::setting(key, format!("{} is out of range", value)));
    }
    Ok(())
}
