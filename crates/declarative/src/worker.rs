//! Background apply worker
//!
//! One apply runs at a time. Progress is published as [`ExecutionEvent`]s
//! over a channel in execution order, so whoever owns the display consumes
//! them on its own thread.

use crate::context::{CommandSet, ElevationBroker, OutputSink};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::snapshot::{SnapshotStore, StateSource};
use crate::types::{
    Action, ActionPlan, ExecuteOptions, ExecuteSummary, ExecutionResult, Snapshot,
};
use execkit::CancelToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Progress of a running apply
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// The plan is about to run; actions in execution order
    PlanStarted(Vec<Action>),
    ActionStarted { index: usize, action: Action },
    /// A progress or command output line
    Line(String),
    ActionFinished(ExecutionResult),
    /// The post-apply snapshot is in the store
    Refreshed(Arc<Snapshot>),
    Finished(ExecuteSummary),
}

/// Everything one apply needs
pub struct ApplyJob {
    pub plan: ActionPlan,
    pub broker: Arc<dyn ElevationBroker>,
    pub commands: Arc<dyn CommandSet>,
    pub source: Arc<dyn StateSource>,
    pub store: Arc<SnapshotStore>,
    pub options: ExecuteOptions,
}

impl ApplyJob {
    /// Execute the plan, refresh the snapshot and report.
    ///
    /// Runs on the calling thread; [`ApplyWorker::spawn`] runs it on a
    /// background one.
    pub fn run(&self, sink: &mut dyn OutputSink, cancel: &CancelToken) -> Vec<ExecutionResult> {
        let executor = Executor::new(
            self.broker.as_ref(),
            self.commands.as_ref(),
            &self.store,
            self.options.clone(),
        );
        let results = executor.execute(&self.plan, sink, cancel);

        if !self.options.dry_run {
            let snapshot = self.store.refresh(self.source.as_ref(), sink);
            sink.on_refreshed(&snapshot);
        }

        sink.on_finished(&ExecuteSummary::from_results(&results));
        results
    }
}

/// Single-flight gate for applies
#[derive(Debug, Default, Clone)]
pub struct ApplyWorker {
    busy: Arc<AtomicBool>,
}

impl ApplyWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an apply is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `job` on a background thread.
    ///
    /// Fails with [`Error::ApplyInProgress`] while another apply is running.
    pub fn spawn(&self, job: ApplyJob) -> Result<ApplyHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ApplyInProgress);
        }
        let guard = FlightGuard(Arc::clone(&self.busy));

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let thread_cancel = cancel.clone();

        let spawned = thread::Builder::new()
            .name("apply".to_string())
            .spawn(move || {
                let _guard = guard;
                job.run(&mut ChannelSink { tx }, &thread_cancel)
            });

        match spawned {
            Ok(thread) => Ok(ApplyHandle { events: rx, cancel, thread }),
            Err(e) => {
                // The closure (and the guard in it) was dropped with the
                // failed spawn, releasing the flag.
                log::error!("Failed to start apply thread: {e}");
                Err(Error::ActionFailure {
                    action: "apply".to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Clears the busy flag when the worker thread ends, panics included
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A running apply
pub struct ApplyHandle {
    events: Receiver<ExecutionEvent>,
    cancel: CancelToken,
    thread: JoinHandle<Vec<ExecutionResult>>,
}

impl ApplyHandle {
    /// Events in execution order; the channel closes when the apply ends
    pub fn events(&self) -> &Receiver<ExecutionEvent> {
        &self.events
    }

    /// A token that cancels this apply
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop the running command and fail the remaining actions
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the apply to end. `None` if the worker panicked.
    pub fn join(self) -> Option<Vec<ExecutionResult>> {
        self.thread.join().ok()
    }
}

/// Publishes sink callbacks as events
struct ChannelSink {
    tx: Sender<ExecutionEvent>,
}

impl ChannelSink {
    fn send(&self, event: ExecutionEvent) {
        // The receiver may be gone; the apply still runs to completion.
        let _ = self.tx.send(event);
    }
}

impl OutputSink for ChannelSink {
    fn on_line(&mut self, line: &str) {
        self.send(ExecutionEvent::Line(line.to_string()));
    }

    fn on_plan_start(&mut self, plan: &ActionPlan) {
        self.send(ExecutionEvent::PlanStarted(plan.actions()));
    }

    fn on_action_start(&mut self, index: usize, action: &Action) {
        self.send(ExecutionEvent::ActionStarted {
            index,
            action: action.clone(),
        });
    }

    fn on_action_complete(&mut self, result: &ExecutionResult) {
        self.send(ExecutionEvent::ActionFinished(result.clone()));
    }

    fn on_refreshed(&mut self, snapshot: &Arc<Snapshot>) {
        self.send(ExecutionEvent::Refreshed(Arc::clone(snapshot)));
    }

    fn on_finished(&mut self, summary: &ExecuteSummary) {
        self.send(ExecutionEvent::Finished(summary.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerError;
    use crate::snapshot::ServiceSnapshot;
    use crate::types::CommandRequest;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Blocks every command until released
    struct GatedBroker {
        release: Mutex<Receiver<()>>,
    }

    impl ElevationBroker for GatedBroker {
        fn run(
            &self,
            request: &CommandRequest,
            on_line: &mut dyn FnMut(&str),
            _cancel: &CancelToken,
        ) -> std::result::Result<i32, BrokerError> {
            let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(5));
            on_line(&format!("ran {request}"));
            Ok(0)
        }
    }

    struct OneStep;

    impl CommandSet for OneStep {
        fn steps(&self, action: &Action) -> Vec<CommandRequest> {
            vec![CommandRequest::new(["xbps-install", "-Sy", action.name()])]
        }
    }

    /// Reports everything as installed once an apply has run
    struct AfterSource;

    impl StateSource for AfterSource {
        fn collect_packages(&self) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::from(["htop".to_string()]))
        }

        fn collect_services(&self) -> Result<ServiceSnapshot> {
            Ok(ServiceSnapshot::default())
        }
    }

    fn job(broker: Arc<dyn ElevationBroker>, store: Arc<SnapshotStore>) -> ApplyJob {
        ApplyJob {
            plan: ActionPlan {
                to_install: vec!["htop".into()],
                ..ActionPlan::default()
            },
            broker,
            commands: Arc::new(OneStep),
            source: Arc::new(AfterSource),
            store,
            options: ExecuteOptions::default(),
        }
    }

    #[test]
    fn test_events_in_order_and_snapshot_refreshed() {
        let (release, gate) = mpsc::channel();
        release.send(()).unwrap();
        let broker = Arc::new(GatedBroker {
            release: Mutex::new(gate),
        });
        let store = Arc::new(SnapshotStore::default());
        let worker = ApplyWorker::new();

        let handle = worker.spawn(job(broker, Arc::clone(&store))).unwrap();
        let events: Vec<_> = handle.events().iter().collect();
        let results = handle.join().unwrap();

        assert_eq!(results.len(), 1);
        assert!(matches!(events.first(), Some(ExecutionEvent::PlanStarted(_))));
        assert!(matches!(events[1], ExecutionEvent::ActionStarted { index: 0, .. }));
        assert!(matches!(&events[2], ExecutionEvent::Line(l) if l == "Installing: htop"));
        assert!(matches!(&events[3], ExecutionEvent::Line(l) if l == "  ran xbps-install -Sy htop"));
        assert!(matches!(events[4], ExecutionEvent::ActionFinished(_)));
        assert!(matches!(events.last(), Some(ExecutionEvent::Finished(s)) if s.succeeded == 1));
        assert!(events.iter().any(|e| matches!(e, ExecutionEvent::Refreshed(_))));
        assert!(store.current().is_installed("htop"));
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_second_apply_rejected_while_running() {
        let (release, gate) = mpsc::channel();
        let broker: Arc<dyn ElevationBroker> = Arc::new(GatedBroker {
            release: Mutex::new(gate),
        });
        let store = Arc::new(SnapshotStore::default());
        let worker = ApplyWorker::new();

        let first = worker.spawn(job(Arc::clone(&broker), Arc::clone(&store))).unwrap();
        assert!(worker.is_busy());
        assert!(matches!(
            worker.spawn(job(Arc::clone(&broker), Arc::clone(&store))),
            Err(Error::ApplyInProgress)
        ));

        release.send(()).unwrap();
        first.join().unwrap();
        assert!(!worker.is_busy());

        release.send(()).unwrap();
        let second = worker.spawn(job(broker, store)).unwrap();
        assert!(second.join().is_some());
    }

    #[test]
    fn test_dry_run_skips_refresh() {
        let (release, gate) = mpsc::channel();
        drop(release);
        let store = Arc::new(SnapshotStore::default());
        let mut job = job(
            Arc::new(GatedBroker {
                release: Mutex::new(gate),
            }),
            Arc::clone(&store),
        );
        job.options.dry_run = true;

        let handle = ApplyWorker::new().spawn(job).unwrap();
        let events: Vec<_> = handle.events().iter().collect();
        handle.join().unwrap();

        assert!(!events.iter().any(|e| matches!(e, ExecutionEvent::Refreshed(_))));
        assert!(!store.current().is_installed("htop"));
    }
}
