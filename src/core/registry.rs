//! # Service registry.
//!
//! Bounded table of service entries kept in registration order, with a
//! name → position index for O(1) lookup.
//!
//! ## Rules
//! - Names are unique.
//! - Removal preserves the relative order of the remaining entries.
//! - Runtime counters live in [`Entry`]; the [`ServiceSpec`] is never mutated.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::state::{ServiceInfo, ServiceState};
use crate::error::SupervisorError;
use crate::services::ServiceSpec;

/// Registered service plus its mutable supervision state.
pub(crate) struct Entry {
    pub(crate) spec: ServiceSpec,
    pub(crate) state: ServiceState,
    pub(crate) restart_count: u32,
    pub(crate) started_at: Option<Instant>,
    pub(crate) last_restart: Option<Instant>,
    /// First tick that observed the current failure (opens the first delay window).
    pub(crate) failed_seen: Option<Instant>,
    /// Delay chosen for the next automatic restart; fixed once drawn.
    pub(crate) retry_delay: Option<Duration>,
}

impl Entry {
    fn new(spec: ServiceSpec) -> Self {
        Self {
            spec,
            state: ServiceState::Stopped,
            restart_count: 0,
            started_at: None,
            last_restart: None,
            failed_seen: None,
            retry_delay: None,
        }
    }

    pub(crate) fn info(&self) -> ServiceInfo {
        ServiceInfo {
            name: self.spec.name().to_string(),
            state: self.state,
            restart_count: self.restart_count,
            max_restarts: self.spec.max_restarts(),
            auto_restart: self.spec.auto_restart(),
            started_at: self.started_at,
            last_restart: self.last_restart,
            dependencies: self.spec.dependencies().to_vec(),
        }
    }

    /// True once the automatic restart budget is used up.
    pub(crate) fn exhausted(&self) -> bool {
        let max = self.spec.max_restarts();
        max > 0 && self.restart_count >= max
    }
}

/// Ordered, bounded service table.
pub(crate) struct Registry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    limit: Option<usize>,
}

impl Registry {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            limit,
        }
    }

    /// Stores `spec` in STOPPED state with zeroed counters.
    pub(crate) fn insert(&mut self, spec: ServiceSpec) -> Result<(), SupervisorError> {
        if self.index.contains_key(spec.name()) {
            return Err(SupervisorError::Duplicate {
                name: spec.name().to_string(),
            });
        }
        if let Some(limit) = self.limit.filter(|&l| self.entries.len() >= l) {
            return Err(SupervisorError::Capacity { limit });
        }
        self.index
            .insert(spec.name().to_string(), self.entries.len());
        self.entries.push(Entry::new(spec));
        Ok(())
    }

    /// Removes `name`, shifting later entries down by one.
    pub(crate) fn remove(&mut self, name: &str) -> Option<Entry> {
        let pos = self.index.remove(name)?;
        let entry = self.entries.remove(pos);
        for idx in self.index.values_mut() {
            if *idx > pos {
                *idx -= 1;
            }
        }
        Some(entry)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.index.get(name).map(|&i| &mut self.entries[i])
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Names in registration order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.spec.name().to_string())
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceFn;

    fn spec(name: &str) -> ServiceSpec {
        ServiceSpec::new(name, ServiceFn::new().arc())
    }

    #[test]
    fn insert_rejects_duplicates_and_overflow() {
        let mut reg = Registry::new(Some(2));
        reg.insert(spec("a")).unwrap();
        assert!(matches!(
            reg.insert(spec("a")),
            Err(SupervisorError::Duplicate { name }) if name == "a"
        ));
        reg.insert(spec("b")).unwrap();
        assert!(matches!(
            reg.insert(spec("c")),
            Err(SupervisorError::Capacity { limit: 2 })
        ));
    }

    #[test]
    fn remove_preserves_order_and_index() {
        let mut reg = Registry::new(None);
        for n in ["a", "b", "c", "d"] {
            reg.insert(spec(n)).unwrap();
        }
        assert!(reg.remove("b").is_some());
        assert_eq!(reg.names(), ["a", "c", "d"]);
        assert_eq!(reg.get("d").map(|e| e.spec.name()), Some("d"));
        assert_eq!(reg.get("c").map(|e| e.spec.name()), Some("c"));
        assert!(reg.remove("b").is_none());
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn new_entries_start_stopped() {
        let mut reg = Registry::new(None);
        reg.insert(spec("a")).unwrap();
        let info = reg.get("a").map(Entry::info).unwrap();
        assert_eq!(info.state, ServiceState::Stopped);
        assert_eq!(info.restart_count, 0);
        assert!(info.started_at.is_none());
    }
}
