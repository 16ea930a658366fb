//! Named pilot factories

use super::Pilot;
use super::builtin::{Hunter, Idle, Wanderer};
use crate::error::SimError;

/// Creates a pilot from a per-ship seed
pub type PilotFactory = Box<dyn Fn(u64) -> Box<dyn Pilot> + Send + Sync>;

/// Pilot factories keyed by name, kept in registration order
///
/// Built once at startup and passed to the simulation builder. Registering a
/// name twice replaces the earlier factory in place.
#[derive(Default)]
pub struct PilotRegistry {
    entries: Vec<(String, PilotFactory)>,
}

impl std::fmt::Debug for PilotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl PilotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `idle`, `wanderer` and `hunter`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("idle", |_| Box::new(Idle))
            .register("wanderer", |seed| Box::new(Wanderer::new(seed)))
            .register("hunter", |_| Box::new(Hunter::default()));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(u64) -> Box<dyn Pilot> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: PilotFactory = Box::new(factory);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
        self
    }

    pub fn create(&self, name: &str, seed: u64) -> Result<Box<dyn Pilot>, SimError> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory(seed))
            .ok_or_else(|| SimError::UnknownPilot(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
