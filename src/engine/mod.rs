//! Wiring between the config, the Void backends and the reconciliation core
//!
//! 1. Collecting - Snapshot installed packages and enabled services
//! 2. Diffing - Build the desired state from config and plan against the snapshot
//! 3. Executing - Run the plan through the elevation broker

pub mod collector;
pub mod differ;
pub mod executor;

use declarative::{
    ApplyJob, CommandSet, DesiredState, ElevationBroker, ExecuteOptions, NullSink, OutputSink,
    Snapshot, SnapshotStore, StateSource,
};
use std::sync::Arc;
use xbpskit::backend::xbps::XbpsBackend;

use crate::config::Config;
use crate::sudo::Broker;
use collector::{SystemSource, VoidCommands};

/// Everything needed to inspect and change the system
pub struct System {
    pub source: Arc<SystemSource<XbpsBackend>>,
    pub commands: Arc<VoidCommands>,
    pub broker: Arc<Broker>,
    pub store: Arc<SnapshotStore>,
}

impl System {
    pub fn from_config(config: &Config) -> Self {
        let backend = XbpsBackend::new(config.tools(), config.packages.name_parser)
            .with_timeout(config.timeouts.query());

        Self {
            source: Arc::new(SystemSource::new(backend, config.service_dirs())),
            commands: Arc::new(VoidCommands {
                tools: config.tools(),
                dirs: config.service_dirs(),
                supervisor: config.supervisor(),
            }),
            broker: Arc::new(Broker::new(
                config.elevation.broker,
                &config.elevation.pass_env,
                config.timeouts.action(),
            )),
            store: Arc::new(SnapshotStore::default()),
        }
    }

    /// Collect a fresh snapshot into the store
    pub fn refresh(&self, sink: &mut dyn OutputSink) -> Arc<Snapshot> {
        self.store.refresh(self.source.as_ref(), sink)
    }

    /// Refresh quietly (failures only logged)
    pub fn refresh_quiet(&self) -> Arc<Snapshot> {
        self.refresh(&mut NullSink)
    }

    /// Desired state declared in the config file, on top of the current snapshot
    pub fn declared(&self, config: &Config, snapshot: &Snapshot) -> (DesiredState, Vec<String>) {
        let mut desired = DesiredState::with_services(snapshot);
        let warnings = desired.declare(
            &config.packages.install,
            &config.packages.remove,
            &config.services.enabled,
            &config.services.disabled,
            snapshot,
        );
        (desired, warnings)
    }

    /// An apply job for `plan`
    pub fn job(&self, plan: declarative::ActionPlan, options: ExecuteOptions) -> ApplyJob {
        let broker: Arc<dyn ElevationBroker> = self.broker.clone();
        let commands: Arc<dyn CommandSet> = self.commands.clone();
        let source: Arc<dyn StateSource> = self.source.clone();
        ApplyJob {
            plan,
            broker,
            commands,
            source,
            store: Arc::clone(&self.store),
            options,
        }
    }
}
