//! Scenario registry and directory discovery
//!
//! The registry maps scenario identifiers to factories producing values
//! implementing [`Scenario`]. Directory discovery registers one
//! file-backed scenario per matching definition file; static registration
//! serves compiled-in scenarios and the engine's own tests.

use std::path::Path;

use regex::Regex;

use crate::common::{Error, Result};

use super::{FileScenario, Scenario};

type Factory = Box<dyn Fn() -> Result<Box<dyn Scenario>> + Send + Sync>;

/// Identifier -> factory map, preserving registration order
#[derive(Default)]
pub struct ScenarioRegistry {
    entries: Vec<(String, Factory)>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing any earlier registration of the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Scenario>> + Send + Sync + 'static,
    {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, Box::new(factory)));
    }

    /// Discover scenario files under `dir` whose names match `pattern` and
    /// register them in sorted order; returns how many were found
    ///
    /// The file stem is the scenario identifier. Definitions are parsed
    /// lazily at load time, so a broken file fails its own scenario rather
    /// than the discovery step.
    pub fn register_dir(&mut self, dir: &Path, pattern: &Regex) -> Result<usize> {
        let mut found = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !pattern.is_match(file_name) {
                continue;
            }
            let stem = Path::new(file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file_name)
                .to_string();
            found.push((stem, entry.path()));
        }

        found.sort();
        let count = found.len();

        for (name, path) in found {
            let id = name.clone();
            self.register(name, move || {
                Ok(Box::new(FileScenario::load(id.clone(), &path)?) as Box<dyn Scenario>)
            });
        }

        Ok(count)
    }

    /// Registered identifiers in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiate the scenario registered under `name`
    pub fn load(&self, name: &str) -> Result<Box<dyn Scenario>> {
        match self.entries.iter().find(|(entry, _)| entry == name) {
            Some((_, factory)) => factory(),
            None => Err(Error::UnknownScenario(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Config;

    #[test]
    fn discovery_filters_by_pattern_in_stable_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_test.yaml", "a_test.yaml", "notes.txt"] {
            std::fs::write(dir.path().join(name), "checks: []\n").unwrap();
        }

        let mut registry = ScenarioRegistry::new();
        let pattern = Config::default().scenario_pattern().unwrap();
        let found = registry.register_dir(dir.path(), &pattern).unwrap();

        assert_eq!(found, 2);
        assert_eq!(registry.names(), vec!["a_test", "b_test"]);
    }

    #[test]
    fn discovered_scenarios_load_by_identifier() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ping_test.yaml"),
            "checks:\n  - program: mbus-call\n    args: [\"ping\"]\n",
        )
        .unwrap();

        let mut registry = ScenarioRegistry::new();
        let pattern = Config::default().scenario_pattern().unwrap();
        registry.register_dir(dir.path(), &pattern).unwrap();

        assert!(registry.load("ping_test").is_ok());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let registry = ScenarioRegistry::new();
        assert!(matches!(
            registry.load("missing"),
            Err(Error::UnknownScenario(_))
        ));
    }

    #[test]
    fn broken_definitions_fail_at_load_not_discovery() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken_test.yaml"), ": not yaml :\n").unwrap();

        let mut registry = ScenarioRegistry::new();
        let pattern = Config::default().scenario_pattern().unwrap();
        let found = registry.register_dir(dir.path(), &pattern).unwrap();

        assert_eq!(found, 1);
        assert!(registry.load("broken_test").is_err());
    }

    #[test]
    fn reregistration_replaces_the_entry() {
        let mut registry = ScenarioRegistry::new();
        registry.register("dup", || Err(Error::ScenarioFailure("first".into())));
        registry.register("dup", || Err(Error::ScenarioFailure("second".into())));

        assert_eq!(registry.len(), 1);
        let err = registry.load("dup").err().unwrap();
        assert!(err.to_string().contains("second"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let mut registry = ScenarioRegistry::new();
        let pattern = Config::default().scenario_pattern().unwrap();
        assert!(registry
            .register_dir(Path::new("/no/such/dir"), &pattern)
            .is_err());
    }
}
