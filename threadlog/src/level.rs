//! Named log levels with numeric severity
//!
//! Levels are a flat name → severity table fixed at construction. Lower
//! severity is more important; an entry is emitted only when its severity is
//! at or below the configured threshold.

use std::collections::HashMap;

use crate::{LoggingError, Result};

/// Default level names, most severe first.
pub const DEFAULT_LEVELS: [&str; 6] = ["error", "warn", "info", "verbose", "debug", "silly"];

/// Immutable name → severity table with an emission threshold.
///
/// Severity is the position in the configured list: index 0 is the most
/// severe. The threshold defaults to the least severe level, so every level
/// is emitted unless the caller tightens it.
#[derive(Debug, Clone)]
pub struct LevelSet {
    names: Vec<String>,
    severities: HashMap<String, usize>,
    threshold: usize,
}

impl LevelSet {
    /// Build a table from an ordered list of level names.
    ///
    /// Fails with [`LoggingError::Config`] on an empty list, a duplicate
    /// name, or a threshold outside the list.
    pub fn new(levels: &[String], threshold: Option<usize>) -> Result<Self> {
        if levels.is_empty() {
            return Err(LoggingError::Config(
                "at least one log level is required".to_string(),
            ));
        }

        let mut severities = HashMap::with_capacity(levels.len());
        for (severity, name) in levels.iter().enumerate() {
            if severities.insert(name.clone(), severity).is_some() {
                return Err(LoggingError::Config(format!(
                    "duplicate log level '{name}'"
                )));
            }
        }

        let threshold = threshold.unwrap_or(levels.len() - 1);
        if threshold >= levels.len() {
            return Err(LoggingError::Config(format!(
                "threshold {threshold} is outside the {} configured levels",
                levels.len()
            )));
        }

        Ok(Self {
            names: levels.to_vec(),
            severities,
            threshold,
        })
    }

    /// Numeric severity of a level name.
    pub fn severity(&self, name: &str) -> Result<usize> {
        self.severities
            .get(name)
            .copied()
            .ok_or_else(|| LoggingError::UnknownLevel(name.to_string()))
    }

    /// Whether an entry at `name` passes the threshold.
    pub fn enabled(&self, name: &str) -> Result<bool> {
        Ok(self.severity(name)? <= self.threshold)
    }

    /// Configured level names, most severe first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Current emission threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for LevelSet {
    fn default() -> Self {
        let names: Vec<String> = DEFAULT_LEVELS.iter().map(|s| s.to_string()).collect();
        let severities = names
            .iter()
            .enumerate()
            .map(|(severity, name)| (name.clone(), severity))
            .collect();
        Self {
            threshold: names.len() - 1,
            names,
            severities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let levels = LevelSet::default();
        assert_eq!(levels.severity("error").unwrap(), 0);
        assert_eq!(levels.severity("silly").unwrap(), 5);
        assert_eq!(levels.threshold(), 5);
        assert!(levels.enabled("silly").unwrap());
    }

    #[test]
    fn test_unknown_level() {
        let levels = LevelSet::default();
        let err = levels.severity("fatal").unwrap_err();
        assert!(matches!(err, LoggingError::UnknownLevel(name) if name == "fatal"));
    }

    #[test]
    fn test_threshold_filters() {
        let names: Vec<String> = DEFAULT_LEVELS.iter().map(|s| s.to_string()).collect();
        let levels = LevelSet::new(&names, Some(1)).unwrap();
        assert!(levels.enabled("error").unwrap());
        assert!(levels.enabled("warn").unwrap());
        assert!(!levels.enabled("info").unwrap());
        assert!(!levels.enabled("silly").unwrap());
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(matches!(
            LevelSet::new(&[], None),
            Err(LoggingError::Config(_))
        ));
        let dup = vec!["a".to_string(), "a".to_string()];
        assert!(matches!(
            LevelSet::new(&dup, None),
            Err(LoggingError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let names = vec!["error".to_string(), "info".to_string()];
        assert!(matches!(
            LevelSet::new(&names, Some(2)),
            Err(LoggingError::Config(_))
        ));
    }
}
