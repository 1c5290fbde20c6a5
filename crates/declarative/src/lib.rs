//! # Declarative
//!
//! Reconcile a machine's packages and services with a declared desired state.
//!
//! This crate holds the reconciliation core, independent of any particular
//! package manager, service supervisor or elevation mechanism:
//!
//! - **Snapshot**: the observed installed-package and enabled-service sets,
//!   replaced wholesale on refresh ([`SnapshotStore`])
//! - **DesiredState**: operator intent (package rows with install/remove
//!   selections, services split into enabled and disabled groups)
//! - **plan**: a pure diff producing an ordered [`ActionPlan`]
//! - **Executor**: runs each action through an [`ElevationBroker`], streaming
//!   output to an [`OutputSink`] and continuing past failures
//! - **ApplyWorker**: single-flight background apply publishing
//!   [`ExecutionEvent`]s
//! - **DebouncedGate**: coalesces bursts of search input
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{DesiredState, Group, SnapshotStore, collect_snapshot, plan, NullSink};
//!
//! let snapshot = collect_snapshot(&source, &mut NullSink);
//! let mut desired = DesiredState::with_services(&snapshot);
//! desired.search("htop", &searcher, &snapshot, &mut NullSink);
//! desired.toggle_selection("htop");
//! desired.move_service("sshd", Group::Enabled, Group::Disabled);
//!
//! let plan = plan(&desired, &snapshot);
//! for action in plan.actions() {
//!     println!("{action}");
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`StateSource`]: reads actual state
//! - [`PackageSearch`]: searches remote repositories
//! - [`ElevationBroker`]: runs commands with elevated privileges
//! - [`CommandSet`]: turns actions into command steps
//! - [`OutputSink`]: receives progress lines and lifecycle events

pub mod context;
pub mod debounce;
pub mod desired;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod snapshot;
pub mod types;
pub mod worker;

// Re-export main types at crate root
pub use context::{CommandSet, ElevationBroker, MemorySink, NullSink, OutputSink};
pub use debounce::DebouncedGate;
pub use desired::{DesiredState, Group};
pub use diff::{DiffSummary, group_by_type};
pub use error::{BrokerError, Error, Result};
pub use executor::Executor;
pub use planner::plan;
pub use snapshot::{
    PackageSearch, ServiceSnapshot, SnapshotStore, StateSource, collect_snapshot, search_or_report,
};
pub use types::{
    Action, ActionKind, ActionPlan, CommandRequest, ExecuteOptions, ExecuteSummary,
    ExecutionResult, Failure, PackageHit, PackageRecord, Selection, ServiceRecord, Snapshot,
};
pub use worker::{ApplyHandle, ApplyJob, ApplyWorker, ExecutionEvent};

pub use execkit::CancelToken;
