//! Alert title → investigation lookup.
//!
//! Investigations are matched by substring against the alert title, in
//! registration order. The first eligible match wins; there is no
//! precedence between overlapping patterns beyond that order, so register
//! more specific titles first.

use std::sync::Arc;

use tracing::{debug, warn};

use super::Investigation;

#[derive(Default, Clone)]
pub struct InvestigationRegistry {
    entries: Vec<Arc<dyn Investigation>>,
}

impl InvestigationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an investigation (builder pattern). An empty title pattern
    /// would match every alert and is rejected.
    pub fn register(mut self, investigation: Arc<dyn Investigation>) -> Self {
        if investigation.alert_title().is_empty() {
            warn!(
                investigation = investigation.name(),
                "refusing to register investigation with empty alert title"
            );
            return self;
        }
        self.entries.push(investigation);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|i| i.name()).collect()
    }

    /// First registered investigation whose pattern occurs in `alert_title`.
    /// Experimental investigations are skipped unless `experimental_enabled`.
    pub fn find(
        &self,
        alert_title: &str,
        experimental_enabled: bool,
    ) -> Option<Arc<dyn Investigation>> {
        for investigation in &self.entries {
            if !alert_title.contains(investigation.alert_title()) {
                continue;
            }
            if investigation.is_experimental() && !experimental_enabled {
                debug!(
                    investigation = investigation.name(),
                    "skipping experimental investigation"
                );
                continue;
            }
            return Some(Arc::clone(investigation));
        }
        None
    }
}

impl std::fmt::Debug for InvestigationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
