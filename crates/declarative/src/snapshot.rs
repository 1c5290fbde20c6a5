//! Snapshot collection and the shared snapshot store

use crate::context::OutputSink;
use crate::error::Result;
use crate::types::{PackageHit, Snapshot};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Service half of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSnapshot {
    /// Service definitions, sorted by name
    pub available: Vec<String>,
    pub enabled: BTreeSet<String>,
}

/// Read-only queries of actual system state
///
/// Implementations must be safe to call repeatedly and concurrently with an
/// apply in progress.
pub trait StateSource: Send + Sync {
    /// Installed package names. Fails with `QueryFailure`.
    fn collect_packages(&self) -> Result<BTreeSet<String>>;

    /// Available and enabled services. Fails with `FilesystemFailure`.
    fn collect_services(&self) -> Result<ServiceSnapshot>;
}

/// Remote package search
pub trait PackageSearch: Send + Sync {
    /// Search by name or description. Fails with `QueryFailure`.
    fn search(&self, query: &str) -> Result<Vec<PackageHit>>;
}

/// Search, writing a failure to `sink` and returning no hits
pub fn search_or_report(
    searcher: &dyn PackageSearch,
    query: &str,
    sink: &mut dyn OutputSink,
) -> Vec<PackageHit> {
    searcher.search(query).unwrap_or_else(|e| {
        log::warn!("Search for '{query}' failed: {e}");
        sink.on_line(&format!("Error: {e}"));
        Vec::new()
    })
}

/// Collect both halves of a snapshot concurrently.
///
/// A failing half is replaced by an empty one; the failure is logged and
/// written to `sink`.
pub fn collect_snapshot(source: &dyn StateSource, sink: &mut dyn OutputSink) -> Snapshot {
    let (packages, services) = rayon::join(
        || source.collect_packages(),
        || source.collect_services(),
    );

    let installed_packages = packages.unwrap_or_else(|e| {
        log::warn!("{e}");
        sink.on_line(&format!("Error: {e}"));
        BTreeSet::new()
    });

    let services = services.unwrap_or_else(|e| {
        log::warn!("{e}");
        sink.on_line(&format!("Error: {e}"));
        ServiceSnapshot::default()
    });

    log::debug!(
        "Snapshot: {} packages installed, {}/{} services enabled",
        installed_packages.len(),
        services.enabled.len(),
        services.available.len()
    );

    Snapshot {
        installed_packages,
        enabled_services: services.enabled,
        available_services: services.available,
    }
}

/// Holder of the latest [`Snapshot`]
///
/// Readers get an `Arc` to an immutable snapshot; a refresh swaps in a new
/// one without disturbing readers still holding the old.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The freshest snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        // A writer can't leave the Arc half-written, so a poisoned lock is
        // still usable.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new snapshot
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&snapshot);
        snapshot
    }

    /// Re-collect from `source` and swap the result in
    pub fn refresh(&self, source: &dyn StateSource, sink: &mut dyn OutputSink) -> Arc<Snapshot> {
        self.replace(collect_snapshot(source, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemorySink;
    use crate::error::Error;

    struct FixedSource {
        packages: Option<Vec<&'static str>>,
        services: Option<(Vec<&'static str>, Vec<&'static str>)>,
    }

    impl StateSource for FixedSource {
        fn collect_packages(&self) -> Result<BTreeSet<String>> {
            match &self.packages {
                Some(names) => Ok(names.iter().map(ToString::to_string).collect()),
                None => Err(Error::QueryFailure("xbps-query not found".into())),
            }
        }

        fn collect_services(&self) -> Result<ServiceSnapshot> {
            match &self.services {
                Some((available, enabled)) => Ok(ServiceSnapshot {
                    available: available.iter().map(ToString::to_string).collect(),
                    enabled: enabled.iter().map(ToString::to_string).collect(),
                }),
                None => Err(Error::FilesystemFailure("/etc/sv: permission denied".into())),
            }
        }
    }

    #[test]
    fn test_collect_combines_both_halves() {
        let source = FixedSource {
            packages: Some(vec!["vim", "htop"]),
            services: Some((vec!["cron", "sshd"], vec!["sshd"])),
        };

        let snap = collect_snapshot(&source, &mut MemorySink::default());
        assert!(snap.is_installed("vim"));
        assert!(snap.is_enabled("sshd"));
        assert_eq!(snap.available_services, vec!["cron", "sshd"]);
    }

    #[test]
    fn test_failures_degrade_to_empty() {
        let source = FixedSource {
            packages: None,
            services: Some((vec!["cron"], vec![])),
        };
        let mut sink = MemorySink::default();

        let snap = collect_snapshot(&source, &mut sink);
        assert!(snap.installed_packages.is_empty());
        assert_eq!(snap.available_services, vec!["cron"]);
        assert_eq!(sink.lines.len(), 1);
        assert!(sink.lines[0].starts_with("Error: package query failed"));

        let source = FixedSource {
            packages: Some(vec!["vim"]),
            services: None,
        };
        let snap = collect_snapshot(&source, &mut sink);
        assert!(snap.available_services.is_empty());
        assert!(snap.is_installed("vim"));
    }

    #[test]
    fn test_store_replaces_without_touching_readers() {
        let store = SnapshotStore::default();
        let before = store.current();

        let source = FixedSource {
            packages: Some(vec!["vim"]),
            services: Some((vec![], vec![])),
        };
        store.refresh(&source, &mut MemorySink::default());

        assert!(before.installed_packages.is_empty());
        assert!(store.current().is_installed("vim"));
    }
}
