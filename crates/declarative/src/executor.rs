//! Execution engine - runs a plan through the elevation broker

use crate::context::{CommandSet, ElevationBroker, OutputSink};
use crate::snapshot::SnapshotStore;
use crate::types::{
    Action, ActionPlan, ExecuteOptions, ExecuteSummary, ExecutionResult, Failure,
};
use execkit::CancelToken;

/// Indent for command output under an action header
const INDENT: &str = "  ";

/// Runs plans one action at a time
///
/// Every action is checked against the freshest snapshot in `store` right
/// before it runs. A failing action is recorded and the batch moves on.
/// Within an action, steps stop at the first failure unless the failing step
/// is best-effort and merely exited non-zero; the first failure is the one
/// recorded.
pub struct Executor<'a> {
    broker: &'a dyn ElevationBroker,
    commands: &'a dyn CommandSet,
    store: &'a SnapshotStore,
    options: ExecuteOptions,
}

impl<'a> Executor<'a> {
    pub fn new(
        broker: &'a dyn ElevationBroker,
        commands: &'a dyn CommandSet,
        store: &'a SnapshotStore,
        options: ExecuteOptions,
    ) -> Self {
        Self {
            broker,
            commands,
            store,
            options,
        }
    }

    /// Execute `plan`, returning one result per action in plan order.
    pub fn execute(
        &self,
        plan: &ActionPlan,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Vec<ExecutionResult> {
        let actions = plan.actions();
        sink.on_plan_start(plan);

        let mut results = Vec::with_capacity(actions.len());
        for (index, action) in actions.into_iter().enumerate() {
            let result = if cancel.is_cancelled() {
                ExecutionResult::cancelled(action)
            } else {
                sink.on_action_start(index, &action);
                self.execute_action(action, sink, cancel)
            };
            sink.on_action_complete(&result);
            results.push(result);
        }

        let summary = ExecuteSummary::from_results(&results);
        sink.on_line("");
        sink.on_line(&summary.done_line());
        results
    }

    fn execute_action(
        &self,
        action: Action,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let snapshot = self.store.current();
        if let Some(message) = action.redundancy(&snapshot) {
            log::info!("{message}");
            sink.on_line(&message);
            return ExecutionResult::skipped(action, message);
        }

        let mut lines = Vec::new();
        emit(sink, &mut lines, action.header());

        let steps = self.commands.steps(&action);
        let mut exit_code = None;
        let mut failure = None;

        for step in &steps {
            if self.options.dry_run {
                emit(
                    sink,
                    &mut lines,
                    format!("{INDENT}would run: {}", self.broker.describe(step)),
                );
                continue;
            }

            log::debug!("Running step for {action}: {step}");
            let outcome = self.broker.run(
                step,
                &mut |line| emit(sink, &mut lines, format!("{INDENT}{line}")),
                cancel,
            );

            let (code, step_failure) = match outcome {
                Ok(0) => (Some(0), None),
                Ok(code) => (Some(code), Some(Failure::ExitCode(code))),
                Err(err) => (None, Some(Failure::from(err))),
            };
            if failure.is_none() {
                exit_code = code;
            }

            if let Some(step_failure) = step_failure {
                log::warn!("{action} failed: {step_failure}");
                emit(sink, &mut lines, format!("{INDENT}Error: {step_failure}"));
                let tolerated =
                    step.best_effort && matches!(step_failure, Failure::ExitCode(_));
                failure.get_or_insert(step_failure);
                if !tolerated {
                    break;
                }
            }
        }

        ExecutionResult {
            action,
            exit_code,
            output_lines: lines,
            succeeded: failure.is_none(),
            skipped: false,
            failure,
        }
    }
}

fn emit(sink: &mut dyn OutputSink, lines: &mut Vec<String>, line: String) {
    sink.on_line(&line);
    lines.push(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemorySink;
    use crate::error::BrokerError;
    use crate::types::{CommandRequest, Snapshot};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Records every argv it is asked to run; fails for listed programs
    #[derive(Default)]
    struct RecordingBroker {
        ran: Mutex<Vec<String>>,
        fail_on: Vec<(&'static str, Result<i32, BrokerError>)>,
    }

    impl ElevationBroker for RecordingBroker {
        fn run(
            &self,
            request: &CommandRequest,
            on_line: &mut dyn FnMut(&str),
            _cancel: &CancelToken,
        ) -> Result<i32, BrokerError> {
            let line = request.to_string();
            self.ran.lock().unwrap().push(line.clone());
            on_line(&format!("ran {line}"));
            for (needle, outcome) in &self.fail_on {
                if line.contains(needle) {
                    return outcome.clone();
                }
            }
            Ok(0)
        }
    }

    struct TestCommands;

    impl CommandSet for TestCommands {
        fn steps(&self, action: &Action) -> Vec<CommandRequest> {
            let name = action.name();
            match action {
                Action::Install(_) => vec![CommandRequest::new(["xbps-install", "-Sy", name])],
                Action::Uninstall(_) => vec![CommandRequest::new(["xbps-remove", "-Ry", name])],
                Action::Enable(_) => vec![
                    CommandRequest::new(["ln", "-sf", &format!("/etc/sv/{name}"), &format!("/var/service/{name}")]),
                    CommandRequest::new(["sv", "up", name]).best_effort(),
                ],
                Action::Disable(_) => vec![
                    CommandRequest::new(["sv", "down", name]).best_effort(),
                    CommandRequest::new(["rm", "-f", &format!("/var/service/{name}")]),
                ],
            }
        }
    }

    fn store() -> SnapshotStore {
        SnapshotStore::new(Snapshot {
            installed_packages: BTreeSet::from(["vim".to_string()]),
            enabled_services: BTreeSet::from(["sshd".to_string()]),
            available_services: vec!["cron".into(), "sshd".into()],
        })
    }

    fn scenario() -> ActionPlan {
        ActionPlan {
            to_install: vec!["htop".into()],
            to_uninstall: vec!["vim".into()],
            to_disable: vec!["sshd".into()],
            to_enable: vec!["cron".into()],
        }
    }

    #[test]
    fn test_scenario_runs_in_order() {
        let broker = RecordingBroker::default();
        let store = store();
        let executor = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default());
        let mut sink = MemorySink::default();

        let results = executor.execute(&scenario(), &mut sink, &CancelToken::new());

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.succeeded && !r.skipped));
        assert_eq!(
            *broker.ran.lock().unwrap(),
            vec![
                "sv down sshd",
                "rm -f /var/service/sshd",
                "ln -sf /etc/sv/cron /var/service/cron",
                "sv up cron",
                "xbps-remove -Ry vim",
                "xbps-install -Sy htop",
            ]
        );
        assert_eq!(sink.lines[0], "Disabling: sshd");
        assert_eq!(sink.lines[1], "  ran sv down sshd");
        assert_eq!(sink.lines.last().unwrap(), "Done: 4 succeeded, 0 failed, 0 skipped.");
    }

    #[test]
    fn test_all_disables_before_any_enable() {
        let broker = RecordingBroker::default();
        let store = SnapshotStore::new(Snapshot {
            enabled_services: ["a", "b"].iter().map(ToString::to_string).collect(),
            ..Snapshot::default()
        });
        let plan = ActionPlan {
            to_disable: vec!["a".into(), "b".into()],
            to_enable: vec!["c".into(), "d".into()],
            ..ActionPlan::default()
        };

        Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default()).execute(
            &plan,
            &mut MemorySink::default(),
            &CancelToken::new(),
        );

        let ran = broker.ran.lock().unwrap();
        let last_down = ran.iter().rposition(|l| l.starts_with("sv down")).unwrap();
        let first_up = ran.iter().position(|l| l.starts_with("sv up")).unwrap();
        assert!(last_down < first_up);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let broker = RecordingBroker {
            fail_on: vec![("xbps-remove", Ok(1))],
            ..RecordingBroker::default()
        };
        let store = store();
        let executor = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default());
        let mut sink = MemorySink::default();

        let results = executor.execute(&scenario(), &mut sink, &CancelToken::new());

        assert_eq!(results.len(), 4);
        let failed: Vec<_> = results.iter().filter(|r| !r.succeeded).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].action, Action::Uninstall("vim".into()));
        assert_eq!(failed[0].exit_code, Some(1));
        assert!(sink.lines.contains(&"  Error: exit code 1".to_string()));
        assert!(broker.ran.lock().unwrap().contains(&"xbps-install -Sy htop".to_string()));
        assert_eq!(sink.lines.last().unwrap(), "Done: 3 succeeded, 1 failed, 0 skipped.");
    }

    #[test]
    fn test_failing_step_stops_action() {
        let broker = RecordingBroker {
            fail_on: vec![("sv down", Err(BrokerError::Denied))],
            ..RecordingBroker::default()
        };
        let store = store();
        let plan = ActionPlan {
            to_disable: vec!["sshd".into()],
            ..ActionPlan::default()
        };

        let results = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default())
            .execute(&plan, &mut MemorySink::default(), &CancelToken::new());

        assert_eq!(*broker.ran.lock().unwrap(), vec!["sv down sshd"]);
        assert_eq!(results[0].failure, Some(Failure::Denied));
        assert_eq!(results[0].exit_code, None);
        assert!(matches!(
            results[0].error(),
            Some(crate::Error::ElevationDenied { .. })
        ));
    }

    #[test]
    fn test_failed_stop_still_removes_link() {
        let broker = RecordingBroker {
            fail_on: vec![("sv down", Ok(1))],
            ..RecordingBroker::default()
        };
        let store = store();
        let plan = ActionPlan {
            to_disable: vec!["sshd".into()],
            ..ActionPlan::default()
        };
        let mut sink = MemorySink::default();

        let results = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default())
            .execute(&plan, &mut sink, &CancelToken::new());

        assert_eq!(
            *broker.ran.lock().unwrap(),
            vec!["sv down sshd", "rm -f /var/service/sshd"]
        );
        assert!(!results[0].succeeded);
        assert_eq!(results[0].failure, Some(Failure::ExitCode(1)));
        assert_eq!(results[0].exit_code, Some(1));
        assert!(sink.lines.contains(&"  Error: exit code 1".to_string()));
    }

    #[test]
    fn test_failed_link_skips_up() {
        let broker = RecordingBroker {
            fail_on: vec![("ln -sf", Ok(1))],
            ..RecordingBroker::default()
        };
        let store = store();
        let plan = ActionPlan {
            to_enable: vec!["cron".into()],
            ..ActionPlan::default()
        };

        let results = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default())
            .execute(&plan, &mut MemorySink::default(), &CancelToken::new());

        assert_eq!(
            *broker.ran.lock().unwrap(),
            vec!["ln -sf /etc/sv/cron /var/service/cron"]
        );
        assert_eq!(results[0].failure, Some(Failure::ExitCode(1)));
    }

    #[test]
    fn test_redundant_action_is_skipped() {
        let broker = RecordingBroker::default();
        let store = store();
        let plan = ActionPlan {
            to_install: vec!["vim".into()],
            to_enable: vec!["sshd".into()],
            ..ActionPlan::default()
        };
        let mut sink = MemorySink::default();

        let results = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default())
            .execute(&plan, &mut sink, &CancelToken::new());

        assert!(results.iter().all(|r| r.skipped && r.succeeded));
        assert!(broker.ran.lock().unwrap().is_empty());
        assert_eq!(sink.lines[0], "sshd already enabled, skipping.");
        assert_eq!(sink.lines[1], "vim already installed, skipping.");
    }

    #[test]
    fn test_recheck_uses_latest_snapshot() {
        /// Installs packages into the store as a side effect
        struct InstallingBroker<'a>(&'a SnapshotStore);

        impl ElevationBroker for InstallingBroker<'_> {
            fn run(
                &self,
                request: &CommandRequest,
                _on_line: &mut dyn FnMut(&str),
                _cancel: &CancelToken,
            ) -> Result<i32, BrokerError> {
                let mut next = (*self.0.current()).clone();
                next.installed_packages.insert("libfoo".to_string());
                next.installed_packages.insert(request.argv[2].clone());
                self.0.replace(next);
                Ok(0)
            }
        }

        let store = SnapshotStore::default();
        let broker = InstallingBroker(&store);
        let plan = ActionPlan {
            to_install: vec!["foo".into(), "libfoo".into()],
            ..ActionPlan::default()
        };

        let results = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default())
            .execute(&plan, &mut MemorySink::default(), &CancelToken::new());

        assert!(!results[0].skipped);
        assert!(results[1].skipped);
    }

    #[test]
    fn test_dry_run_runs_nothing() {
        let broker = RecordingBroker::default();
        let store = store();
        let options = ExecuteOptions { dry_run: true };
        let mut sink = MemorySink::default();

        let results = Executor::new(&broker, &TestCommands, &store, options).execute(
            &scenario(),
            &mut sink,
            &CancelToken::new(),
        );

        assert!(broker.ran.lock().unwrap().is_empty());
        assert!(results.iter().all(|r| r.succeeded));
        assert!(sink.lines.contains(&"  would run: xbps-install -Sy htop".to_string()));
    }

    #[test]
    fn test_cancelled_marks_remaining() {
        let broker = RecordingBroker::default();
        let store = store();
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = Executor::new(&broker, &TestCommands, &store, ExecuteOptions::default())
            .execute(&scenario(), &mut MemorySink::default(), &cancel);

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.failure == Some(Failure::Cancelled)));
        assert!(broker.ran.lock().unwrap().is_empty());
    }
}
