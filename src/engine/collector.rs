//! Void Linux bindings for the reconciliation core
//!
//! [`SystemSource`] reads actual state through `xbps-query` and the runit
//! directories; [`VoidCommands`] turns actions into xbps and runit commands.

use declarative::{
    Action, CommandRequest, CommandSet, Error, PackageHit, PackageSearch, Result, ServiceSnapshot,
    StateSource,
};
use runitkit::{ServiceDirs, Supervisor};
use std::collections::BTreeSet;
use xbpskit::backend::Backend;
use xbpskit::{Directive, Tools};

/// Reads packages through an xbps backend and services from the filesystem
pub struct SystemSource<B> {
    backend: B,
    dirs: ServiceDirs,
}

impl<B: Backend> SystemSource<B> {
    pub fn new(backend: B, dirs: ServiceDirs) -> Self {
        Self { backend, dirs }
    }
}

impl<B: Backend> StateSource for SystemSource<B> {
    fn collect_packages(&self) -> Result<BTreeSet<String>> {
        self.backend
            .installed_names()
            .map_err(|e| Error::QueryFailure(e.to_string()))
    }

    fn collect_services(&self) -> Result<ServiceSnapshot> {
        let state = self
            .dirs
            .scan()
            .map_err(|e| Error::FilesystemFailure(e.to_string()))?;
        Ok(ServiceSnapshot {
            available: state.available.into_iter().collect(),
            enabled: state.enabled,
        })
    }
}

impl<B: Backend> PackageSearch for SystemSource<B> {
    fn search(&self, query: &str) -> Result<Vec<PackageHit>> {
        let hits = self
            .backend
            .search(query)
            .map_err(|e| Error::QueryFailure(e.to_string()))?;
        Ok(hits
            .into_iter()
            .map(|hit| PackageHit {
                name: hit.name,
                description: hit.description,
            })
            .collect())
    }
}

/// Command steps for xbps packages and runit services
#[derive(Debug, Clone)]
pub struct VoidCommands {
    pub tools: Tools,
    pub dirs: ServiceDirs,
    pub supervisor: Supervisor,
}

impl CommandSet for VoidCommands {
    fn steps(&self, action: &Action) -> Vec<CommandRequest> {
        let name = action.name();
        let service_steps = |steps: Vec<runitkit::Step>| -> Vec<CommandRequest> {
            steps
                .into_iter()
                .map(|step| {
                    let request = CommandRequest::new(step.argv);
                    if step.best_effort { request.best_effort() } else { request }
                })
                .collect()
        };
        match action {
            Action::Install(_) => vec![CommandRequest::new(xbpskit::command::for_directive(
                &self.tools,
                Directive::Install,
                name,
            ))],
            Action::Uninstall(_) => vec![CommandRequest::new(xbpskit::command::for_directive(
                &self.tools,
                Directive::Remove,
                name,
            ))],
            Action::Enable(_) => {
                service_steps(runitkit::enable_steps(&self.dirs, &self.supervisor, name))
            }
            Action::Disable(_) => {
                service_steps(runitkit::disable_steps(&self.dirs, &self.supervisor, name))
            }
        }
    }
}
