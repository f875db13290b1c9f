//! Plugin hooks.
//!
//! A plugin is registered by name on the [`Library`](crate::Library) and gets
//! called at four fixed points of a compilation. Every hook has a no-op default,
//! so a plugin implements only what it needs.

use crate::library::AnnotationSpec;
use crate::settings::Settings;
use crate::state::NoteEvent;
use crate::walker::{NotationBuckets, SubtrackResult, TrackResult};

pub trait Plugin {
    /// Annotation kinds this plugin adds, registered along with the plugin.
    fn annotations(&self) -> Vec<(String, AnnotationSpec)> {
        Vec::new()
    }

    /// Runs once per compilation, before the first section.
    fn global_setup(&self, _settings: &mut Settings) {}

    /// Runs after a nested result has been merged into its parent.
    fn on_merge(&self, _notation: &mut NotationBuckets, _nested: &SubtrackResult) {}

    /// Runs on the events a note starts, before they are stored.
    fn note_epilogue(&self, _events: &mut [NoteEvent], _settings: &Settings) {}

    /// Runs on each finished top-level track.
    fn track_epilogue(&self, _track: &mut TrackResult) {}
}

/// Plugins in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<(String, Box<dyn Plugin>)>,
}

impl PluginRegistry {
    /// Register `plugin` under `name`, replacing any plugin already using it.
    /// A replaced plugin keeps its place in the order.
    pub fn register(&mut self, name: &str, plugin: Box<dyn Plugin>) {
        match self.plugins.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = plugin,
            None => self.plugins.push((name.to_string(), plugin)),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub(crate) fn global_setup(&self, settings: &mut Settings) {
        for (_, plugin) in &self.plugins {
            plugin.global_setup(settings);
        }
    }

    pub(crate) fn on_merge(&self, notation: &mut NotationBuckets, nested: &SubtrackResult) {
        for (_, plugin) in &self.plugins {
            plugin.on_merge(notation, nested);
        }
    }

    pub(crate) fn note_epilogue(&self, events: &mut [NoteEvent], settings: &Settings) {
        for (_, plugin) in &self.plugins {
            plugin.note_epilogue(events, settings);
        }
    }

    pub(crate) fn track_epilogue(&self, track: &mut TrackResult) {
        for (_, plugin) in &self.plugins {
            plugin.track_epilogue(track);
        }
    }
}
