//! Load lifecycle observation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lifecycle phases for loading one remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    /// Entry fetch started.
    FetchStart,
    /// Entry manifest fetched and parsed.
    EntryLoaded,
    /// A specific export resolved successfully.
    Resolved(String),
    /// The load failed.
    Failed(String),
}

/// Observer trait for load lifecycle events.
pub trait LoadObserver: Send + Sync {
    /// Called once per phase per alias.
    fn on_phase(&self, alias: &str, phase: LoadPhase, elapsed: Duration);
}

/// Timing marks for a loader's lifetime.
///
/// Attach one as an observer and it records a `<alias>_loaded` mark when an
/// entry manifest arrives and a `<alias>_resolved` mark per resolved export.
#[derive(Debug)]
pub struct LoadTiming {
    start: Instant,
    marks: Mutex<HashMap<String, Instant>>,
}

impl LoadTiming {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: Mutex::new(HashMap::new()),
        }
    }

    /// Record a timing mark.
    pub fn mark(&self, name: &str) {
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), Instant::now());
    }

    /// Elapsed time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time from start to a recorded mark.
    pub fn time_to(&self, name: &str) -> Option<Duration> {
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .map(|t| t.duration_since(self.start))
    }

    /// Time from start to the first entry-loaded mark.
    pub fn time_to_first_entry(&self) -> Option<Duration> {
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(k, _)| k.ends_with("_loaded"))
            .map(|(_, t)| t.duration_since(self.start))
            .min()
    }
}

impl Default for LoadTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadObserver for LoadTiming {
    fn on_phase(&self, alias: &str, phase: LoadPhase, _elapsed: Duration) {
        match phase {
            LoadPhase::EntryLoaded => self.mark(&format!("{}_loaded", alias)),
            LoadPhase::Resolved(_) => self.mark(&format!("{}_resolved", alias)),
            LoadPhase::FetchStart | LoadPhase::Failed(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_are_ordered_after_start() {
        let timing = LoadTiming::new();
        timing.mark("usersApp_loaded");
        timing.mark("editUserApp_loaded");

        assert!(timing.time_to("usersApp_loaded").is_some());
        assert!(timing.time_to("missing").is_none());
        assert!(timing.time_to_first_entry().unwrap() <= timing.elapsed());
    }

    #[test]
    fn test_phases_map_to_marks() {
        let timing = LoadTiming::new();
        timing.on_phase("usersApp", LoadPhase::FetchStart, Duration::ZERO);
        assert!(timing.time_to_first_entry().is_none());

        timing.on_phase("usersApp", LoadPhase::EntryLoaded, Duration::ZERO);
        timing.on_phase(
            "usersApp",
            LoadPhase::Resolved("./UserList".to_string()),
            Duration::ZERO,
        );
        assert!(timing.time_to("usersApp_loaded").is_some());
        assert!(timing.time_to("usersApp_resolved").is_some());
    }
}
