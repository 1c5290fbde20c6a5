//! Operator-editable desired state
//!
//! Packages are rows of a search table, each carrying an install or removal
//! intent. Services are split into an enabled and a disabled group; which
//! group a service sits in is its desired state.

use crate::context::OutputSink;
use crate::snapshot::{PackageSearch, search_or_report};
use crate::types::{PackageHit, PackageRecord, Selection, ServiceRecord, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Desired service group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Enabled,
    Disabled,
}

impl Group {
    /// The group matching an actual enabled flag
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// Packages and services as the operator wants them
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    packages: Vec<PackageRecord>,
    enabled: Vec<ServiceRecord>,
    disabled: Vec<ServiceRecord>,
    last_query: Option<String>,
}

impl DesiredState {
    /// Empty package table, services partitioned by their actual state
    pub fn with_services(snapshot: &Snapshot) -> Self {
        let mut state = Self::default();
        for name in &snapshot.available_services {
            let enabled_actual = snapshot.is_enabled(name);
            state.group_mut(Group::from_enabled(enabled_actual)).push(ServiceRecord {
                name: name.clone(),
                enabled_actual,
            });
        }
        state
    }

    /// Current package rows
    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    /// Services in `group`, in display order
    pub fn services(&self, group: Group) -> &[ServiceRecord] {
        match group {
            Group::Enabled => &self.enabled,
            Group::Disabled => &self.disabled,
        }
    }

    /// The last non-empty query that populated the table
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    fn group_mut(&mut self, group: Group) -> &mut Vec<ServiceRecord> {
        match group {
            Group::Enabled => &mut self.enabled,
            Group::Disabled => &mut self.disabled,
        }
    }

    /// Which group `name` is in
    pub fn group_of(&self, name: &str) -> Option<Group> {
        if self.enabled.iter().any(|s| s.name == name) {
            Some(Group::Enabled)
        } else if self.disabled.iter().any(|s| s.name == name) {
            Some(Group::Disabled)
        } else {
            None
        }
    }

    /// Run a search and replace the table with its results.
    ///
    /// An empty (or whitespace) query clears the table without searching. A
    /// failing search leaves an empty table and writes the error to `sink`.
    pub fn search(
        &mut self,
        query: &str,
        searcher: &dyn PackageSearch,
        snapshot: &Snapshot,
        sink: &mut dyn OutputSink,
    ) -> &[PackageRecord] {
        let query = query.trim();
        if query.is_empty() {
            self.clear();
            return &self.packages;
        }

        let hits = search_or_report(searcher, query, sink);
        self.replace_results(query, hits, snapshot);
        &self.packages
    }

    /// Replace the table with `hits`, carrying over the selection of any name
    /// that was already in the table.
    pub fn replace_results(&mut self, query: &str, hits: Vec<PackageHit>, snapshot: &Snapshot) {
        let previous: HashMap<String, Selection> = self
            .packages
            .drain(..)
            .map(|row| (row.name, row.selection))
            .collect();

        let mut seen = BTreeSet::new();
        self.packages = hits
            .into_iter()
            .filter(|hit| seen.insert(hit.name.clone()))
            .map(|hit| PackageRecord {
                installed_actual: snapshot.is_installed(&hit.name),
                selection: previous.get(&hit.name).copied().unwrap_or_default(),
                name: hit.name,
                description: hit.description,
            })
            .collect();
        self.last_query = Some(query.trim().to_string());
    }

    /// Drop all package rows
    pub fn clear(&mut self) {
        self.packages.clear();
        self.last_query = None;
    }

    fn package_mut(&mut self, name: &str) -> Option<&mut PackageRecord> {
        self.packages.iter_mut().find(|row| row.name == name)
    }

    /// Set the intent of a row. Returns false for unknown names.
    pub fn set_selection(&mut self, name: &str, selection: Selection) -> bool {
        match self.package_mut(name) {
            Some(row) => {
                row.selection = selection;
                true
            }
            None => false,
        }
    }

    /// Toggle the install intent of a row. Unknown names are ignored.
    pub fn toggle_selection(&mut self, name: &str) -> bool {
        self.toggle(name, Selection::Install)
    }

    /// Toggle the removal intent of a row. Unknown names are ignored.
    pub fn toggle_removal(&mut self, name: &str) -> bool {
        self.toggle(name, Selection::Remove)
    }

    fn toggle(&mut self, name: &str, intent: Selection) -> bool {
        match self.package_mut(name) {
            Some(row) => {
                row.selection = if row.selection == intent {
                    Selection::Unselected
                } else {
                    intent
                };
                true
            }
            None => false,
        }
    }

    /// Move a service from one group to the other.
    ///
    /// No-op (returns false) when `from == to` or `name` is not in `from`.
    pub fn move_service(&mut self, name: &str, from: Group, to: Group) -> bool {
        if from == to {
            return false;
        }
        let source = self.group_mut(from);
        let Some(index) = source.iter().position(|s| s.name == name) else {
            return false;
        };
        let record = source.remove(index);
        self.group_mut(to).push(record);
        true
    }

    /// Put a service into `group`, wherever it is now.
    ///
    /// Returns false for services that are not available.
    pub fn place_service(&mut self, name: &str, group: Group) -> bool {
        match self.group_of(name) {
            Some(current) if current == group => true,
            Some(current) => self.move_service(name, current, group),
            None => false,
        }
    }

    /// Add declared package intents and service placements.
    ///
    /// Packages not yet in the table get a row with no description. A name in
    /// both `install` and `remove` ends up with the removal intent. Returns
    /// one warning per conflicting or unknown entry.
    pub fn declare(
        &mut self,
        install: &[String],
        remove: &[String],
        enable: &[String],
        disable: &[String],
        snapshot: &Snapshot,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        for (names, selection) in [(install, Selection::Install), (remove, Selection::Remove)] {
            for name in names {
                if !self.set_selection(name, selection) {
                    let mut row = PackageRecord::new(name.clone(), "");
                    row.installed_actual = snapshot.is_installed(name);
                    row.selection = selection;
                    self.packages.push(row);
                }
            }
        }
        for name in install.iter().filter(|n| remove.contains(n)) {
            warnings.push(format!("package '{name}' is listed for both install and remove; removing"));
        }

        for (names, group) in [(enable, Group::Enabled), (disable, Group::Disabled)] {
            for name in names {
                if !self.place_service(name, group) {
                    warnings.push(format!("service '{name}' has no definition; ignored"));
                }
            }
        }
        for name in enable.iter().filter(|n| disable.contains(n)) {
            warnings.push(format!("service '{name}' is listed as both enabled and disabled; disabling"));
        }

        warnings
    }

    /// Re-mark actual flags after a refresh.
    ///
    /// Newly available services join the group matching their actual state;
    /// services whose definition disappeared are dropped.
    pub fn refresh_actual(&mut self, snapshot: &Snapshot) {
        for row in &mut self.packages {
            row.installed_actual = snapshot.is_installed(&row.name);
        }

        let available: BTreeSet<&str> = snapshot.available_services.iter().map(String::as_str).collect();
        for group in [Group::Enabled, Group::Disabled] {
            let records = self.group_mut(group);
            records.retain(|s| available.contains(s.name.as_str()));
            for record in records.iter_mut() {
                record.enabled_actual = snapshot.is_enabled(&record.name);
            }
        }

        for name in &snapshot.available_services {
            if self.group_of(name).is_none() {
                let enabled_actual = snapshot.is_enabled(name);
                self.group_mut(Group::from_enabled(enabled_actual)).push(ServiceRecord {
                    name: name.clone(),
                    enabled_actual,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemorySink, NullSink};
    use crate::error::{Error, Result};
    use std::sync::Mutex;

    struct ListSearch {
        hits: Vec<(&'static str, &'static str)>,
        calls: Mutex<usize>,
    }

    impl ListSearch {
        fn new(hits: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                hits,
                calls: Mutex::new(0),
            }
        }
    }

    impl PackageSearch for ListSearch {
        fn search(&self, query: &str) -> Result<Vec<PackageHit>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self
                .hits
                .iter()
                .filter(|(name, _)| name.contains(query))
                .map(|(name, description)| PackageHit {
                    name: (*name).to_string(),
                    description: (*description).to_string(),
                })
                .collect())
        }
    }

    struct FailingSearch;

    impl PackageSearch for FailingSearch {
        fn search(&self, _query: &str) -> Result<Vec<PackageHit>> {
            Err(Error::QueryFailure("xbps-query exited with code 1".into()))
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            installed_packages: BTreeSet::from(["vim".to_string()]),
            enabled_services: BTreeSet::from(["sshd".to_string()]),
            available_services: vec!["cron".into(), "dbus".into(), "sshd".into()],
        }
    }

    #[test]
    fn test_services_partitioned_by_actual_state() {
        let state = DesiredState::with_services(&snapshot());
        let enabled: Vec<_> = state.services(Group::Enabled).iter().map(|s| s.name.as_str()).collect();
        let disabled: Vec<_> = state.services(Group::Disabled).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(enabled, vec!["sshd"]);
        assert_eq!(disabled, vec!["cron", "dbus"]);
    }

    #[test]
    fn test_search_marks_installed() {
        let searcher = ListSearch::new(vec![("vim", "Vim editor"), ("vim-x11", "X11 variant")]);
        let mut state = DesiredState::default();

        let rows = state.search("vim", &searcher, &snapshot(), &mut NullSink);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].installed_actual);
        assert!(!rows[1].installed_actual);
        assert_eq!(state.last_query(), Some("vim"));
    }

    #[test]
    fn test_empty_query_clears_without_searching() {
        let searcher = ListSearch::new(vec![("vim", "Vim editor")]);
        let mut state = DesiredState::default();
        state.search("vim", &searcher, &snapshot(), &mut NullSink);

        assert!(state.search("   ", &searcher, &snapshot(), &mut NullSink).is_empty());
        assert_eq!(*searcher.calls.lock().unwrap(), 1);
        assert_eq!(state.last_query(), None);
    }

    #[test]
    fn test_failed_search_leaves_empty_table() {
        let mut state = DesiredState::default();
        let mut sink = MemorySink::default();
        assert!(state.search("vim", &FailingSearch, &snapshot(), &mut sink).is_empty());
        assert_eq!(
            sink.lines,
            vec!["Error: package query failed: xbps-query exited with code 1"]
        );
    }

    #[test]
    fn test_selection_persists_across_research() {
        let searcher = ListSearch::new(vec![("htop", "Process viewer"), ("htop-extra", "")]);
        let mut state = DesiredState::default();

        state.search("htop", &searcher, &snapshot(), &mut NullSink);
        assert!(state.toggle_selection("htop"));
        state.search("ht", &searcher, &snapshot(), &mut NullSink);

        let htop = state.packages().iter().find(|r| r.name == "htop").unwrap();
        assert!(htop.is_selected());
        let extra = state.packages().iter().find(|r| r.name == "htop-extra").unwrap();
        assert!(!extra.is_selected());
    }

    #[test]
    fn test_duplicate_hits_collapse() {
        let mut state = DesiredState::default();
        let hits = vec![
            PackageHit { name: "vim".into(), description: "first".into() },
            PackageHit { name: "vim".into(), description: "second".into() },
        ];
        state.replace_results("vim", hits, &snapshot());
        assert_eq!(state.packages().len(), 1);
        assert_eq!(state.packages()[0].description, "first");
    }

    #[test]
    fn test_toggles() {
        let searcher = ListSearch::new(vec![("vim", "Vim editor")]);
        let mut state = DesiredState::default();
        state.search("vim", &searcher, &snapshot(), &mut NullSink);

        state.toggle_removal("vim");
        assert_eq!(state.packages()[0].selection, Selection::Remove);
        state.toggle_selection("vim");
        assert_eq!(state.packages()[0].selection, Selection::Install);
        state.toggle_selection("vim");
        assert_eq!(state.packages()[0].selection, Selection::Unselected);
        assert!(!state.toggle_selection("emacs"));
    }

    #[test]
    fn test_move_service_noops() {
        let mut state = DesiredState::with_services(&snapshot());
        assert!(!state.move_service("cron", Group::Enabled, Group::Disabled));
        assert!(!state.move_service("cron", Group::Disabled, Group::Disabled));
        assert!(state.move_service("cron", Group::Disabled, Group::Enabled));
        assert_eq!(state.group_of("cron"), Some(Group::Enabled));
    }

    #[test]
    fn test_declare() {
        let mut state = DesiredState::with_services(&snapshot());
        let warnings = state.declare(
            &["htop".into(), "git".into()],
            &["git".into()],
            &["cron".into(), "nosuch".into()],
            &["sshd".into()],
            &snapshot(),
        );

        assert_eq!(warnings.len(), 2);
        let git = state.packages().iter().find(|r| r.name == "git").unwrap();
        assert_eq!(git.selection, Selection::Remove);
        assert_eq!(state.group_of("cron"), Some(Group::Enabled));
        assert_eq!(state.group_of("sshd"), Some(Group::Disabled));
    }

    #[test]
    fn test_refresh_actual() {
        let searcher = ListSearch::new(vec![("htop", "")]);
        let mut state = DesiredState::with_services(&snapshot());
        state.search("htop", &searcher, &snapshot(), &mut NullSink);

        let after = Snapshot {
            installed_packages: BTreeSet::from(["htop".to_string()]),
            enabled_services: BTreeSet::from(["cron".to_string()]),
            available_services: vec!["cron".into(), "sshd".into(), "udevd".into()],
        };
        state.refresh_actual(&after);

        assert!(state.packages()[0].installed_actual);
        assert_eq!(state.group_of("dbus"), None);
        assert_eq!(state.group_of("udevd"), Some(Group::Disabled));
        // Group membership is intent; refresh only updates the actual flag
        let sshd = state.services(Group::Enabled).iter().find(|s| s.name == "sshd").unwrap();
        assert!(!sshd.enabled_actual);
    }
}
