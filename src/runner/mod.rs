//! Scenario orchestration
//!
//! The runner owns the daemon for the whole invocation: start it and
//! confirm it stays up, discover the scenario set, execute each scenario
//! under fault isolation, stop the daemon, and hand the outcomes over for
//! reporting. Only daemon startup failures and errors outside scenario
//! boundaries are fatal; everything a scenario does wrong becomes data.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::common::config::ReadyProbe;
use crate::common::{Config, Error, Result};
use crate::process::{self, ProcessHandle};
use crate::report::{RunReport, ScenarioOutcome};
use crate::scenario::{ScenarioContext, ScenarioRegistry};

/// State spanning one invocation: the daemon handle and the outcomes
/// accumulated so far. Exactly one exists per run.
struct RunSession {
    daemon: ProcessHandle,
    outcomes: Vec<ScenarioOutcome>,
}

/// Runs scenarios against a live daemon
pub struct Runner {
    config: Config,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the named scenarios, or every discovered one when `names` is
    /// empty, and return the accumulated report
    pub async fn run(&self, names: &[String]) -> Result<RunReport> {
        let mut session = self.start_daemon().await?;
        let result = self.discover_and_execute(&mut session, names).await;
        self.stop_daemon(&mut session.daemon).await;
        result.map(|()| RunReport::new(session.outcomes))
    }

    /// Run against an explicitly populated registry (static registration)
    pub async fn run_with_registry(
        &self,
        registry: &ScenarioRegistry,
        names: &[String],
    ) -> Result<RunReport> {
        let mut session = self.start_daemon().await?;
        self.execute_all(&mut session, registry, names).await;
        self.stop_daemon(&mut session.daemon).await;
        Ok(RunReport::new(session.outcomes))
    }

    async fn discover_and_execute(
        &self,
        session: &mut RunSession,
        names: &[String],
    ) -> Result<()> {
        let mut registry = ScenarioRegistry::new();
        let pattern = self.config.scenario_pattern()?;
        let found = registry.register_dir(&self.config.scenarios.dir, &pattern)?;
        debug!(
            found,
            dir = %self.config.scenarios.dir.display(),
            "discovered scenario definitions"
        );
        self.execute_all(session, &registry, names).await;
        Ok(())
    }

    async fn execute_all(
        &self,
        session: &mut RunSession,
        registry: &ScenarioRegistry,
        names: &[String],
    ) {
        let selected = if names.is_empty() {
            info!("running all regression scenarios");
            registry.names()
        } else {
            names.to_vec()
        };

        for name in &selected {
            let outcome = self.execute(registry, name).await;
            session.outcomes.push(outcome);
        }
    }

    /// Execute one scenario under fault isolation; never fails the run
    async fn execute(&self, registry: &ScenarioRegistry, name: &str) -> ScenarioOutcome {
        info!("running scenario '{name}'");

        let mut scenario = match registry.load(name) {
            Ok(scenario) => scenario,
            Err(e) => return self.record_outcome(name, Err(e)),
        };

        let cx = ScenarioContext::new(&self.config);

        let mut result = scenario.init(&cx).await;
        if result.is_ok() {
            result = scenario.run(&cx).await;
        }

        // finalize runs whatever came of init/run; its error surfaces only
        // if the scenario had not already failed
        if let Err(e) = scenario.finalize(&cx).await {
            if result.is_ok() {
                result = Err(e);
            } else {
                warn!("scenario '{name}' finalize failed: {e}");
            }
        }

        self.record_outcome(name, result)
    }

    fn record_outcome(&self, name: &str, result: Result<()>) -> ScenarioOutcome {
        let outcome = ScenarioOutcome::from_result(name, result);
        match outcome.status() {
            crate::report::ScenarioStatus::Failed { message } => {
                warn!("scenario '{name}' failed: {message}");
            }
            crate::report::ScenarioStatus::Error { message } => {
                warn!("scenario '{name}' hit an unexpected error: {message}");
            }
            crate::report::ScenarioStatus::Passed => {}
        }
        outcome
    }

    /// Launch the daemon and confirm it stays up across the settle window
    /// (plus the configured readiness probe, if any)
    async fn start_daemon(&self) -> Result<RunSession> {
        let program = self.config.resolve_binary(&self.config.daemon.binary)?;
        info!("starting daemon '{}'", program.display());

        let mut daemon = ProcessHandle::start(&program, &self.config.daemon.args)?;
        let window = Duration::from_millis(self.config.daemon.settle_ms);

        if let Some(code) = process::settle(&mut daemon, window).await? {
            let stderr = match daemon.communicate(self.config.timeouts.wait()).await {
                Ok((_, stderr)) => String::from_utf8_lossy(&stderr).trim().to_string(),
                Err(_) => String::new(),
            };
            return Err(Error::DaemonStartup {
                program: program.display().to_string(),
                code,
                stderr,
            });
        }

        if let Some(probe) = &self.config.daemon.ready {
            self.wait_ready(probe).await?;
        }

        debug!("daemon confirmed running");
        Ok(RunSession {
            daemon,
            outcomes: Vec::new(),
        })
    }

    /// Retry the configured probe command until it exits 0
    async fn wait_ready(&self, probe: &ReadyProbe) -> Result<()> {
        let program = self.config.resolve_binary(&probe.program)?;

        for attempt in 1..=probe.attempts {
            let mut handle = ProcessHandle::start(&program, &probe.args)?;
            let code = handle.wait(self.config.timeouts.wait()).await?;
            if code == 0 {
                debug!(attempt, "readiness probe succeeded");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(probe.interval_ms)).await;
        }

        Err(Error::DaemonNotReady {
            probe: probe.program.clone(),
            attempts: probe.attempts,
        })
    }

    /// Request daemon termination and reap it
    ///
    /// A non-zero exit code here only concerns orderly shutdown and is
    /// reported as a warning, never as a scenario failure.
    async fn stop_daemon(&self, daemon: &mut ProcessHandle) {
        info!("stopping daemon");
        daemon.terminate();

        match daemon.communicate(self.config.timeouts.wait()).await {
            Ok(_) => match daemon.exit_code() {
                Some(0) | None => {}
                Some(code) => warn!("daemon exited with code {code} on shutdown"),
            },
            Err(e) => warn!("daemon did not shut down cleanly: {e}"),
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ProbeScenario {
        fail: bool,
        fail_init: bool,
        ran: Arc<AtomicUsize>,
        finalized: Arc<AtomicUsize>,
    }

    impl ProbeScenario {
        fn passing(ran: &Arc<AtomicUsize>, finalized: &Arc<AtomicUsize>) -> Self {
            Self {
                fail: false,
                fail_init: false,
                ran: ran.clone(),
                finalized: finalized.clone(),
            }
        }

        fn failing(ran: &Arc<AtomicUsize>, finalized: &Arc<AtomicUsize>) -> Self {
            Self {
                fail: true,
                ..Self::passing(ran, finalized)
            }
        }
    }

    #[async_trait]
    impl Scenario for ProbeScenario {
        async fn init(&mut self, _cx: &ScenarioContext<'_>) -> Result<()> {
            if self.fail_init {
                return Err(Error::ScenarioFailure("init refused".into()));
            }
            Ok(())
        }

        async fn run(&mut self, _cx: &ScenarioContext<'_>) -> Result<()> {
            self.ran.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::ScenarioFailure("probe failed".into()));
            }
            Ok(())
        }

        async fn finalize(&mut self, _cx: &ScenarioContext<'_>) -> Result<()> {
            self.finalized.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(daemon_script: &str, settle_ms: u64) -> Config {
        let mut config = Config::default();
        config.daemon.binary = "sh".to_string();
        config.daemon.args = vec!["-c".to_string(), daemon_script.to_string()];
        config.daemon.settle_ms = settle_ms;
        config.timeouts.wait_secs = 10;
        config
    }

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
    }

    #[tokio::test]
    async fn one_outcome_per_scenario_in_order() {
        let (ran_a, fin_a) = counters();
        let (ran_b, fin_b) = counters();

        let mut registry = ScenarioRegistry::new();
        let (ra, fa) = (ran_a.clone(), fin_a.clone());
        registry.register("b_first", move || {
            Ok(Box::new(ProbeScenario::failing(&ra, &fa)) as Box<dyn Scenario>)
        });
        let (rb, fb) = (ran_b.clone(), fin_b.clone());
        registry.register("a_second", move || {
            Ok(Box::new(ProbeScenario::passing(&rb, &fb)) as Box<dyn Scenario>)
        });

        let runner = Runner::new(test_config("sleep 30", 50));
        let report = runner.run_with_registry(&registry, &[]).await.unwrap();

        // registration order, not alphabetical
        assert_eq!(report.executed(), 2);
        assert_eq!(report.outcomes()[0].name(), "b_first");
        assert_eq!(report.outcomes()[1].name(), "a_second");
        assert!(!report.outcomes()[0].is_passed());
        assert!(report.outcomes()[1].is_passed());

        // the first scenario's failure did not stop the loop
        assert_eq!(ran_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_message_is_recorded() {
        let (ran, finalized) = counters();
        let mut registry = ScenarioRegistry::new();
        let (r, f) = (ran.clone(), finalized.clone());
        registry.register("fails", move || {
            Ok(Box::new(ProbeScenario::failing(&r, &f)) as Box<dyn Scenario>)
        });

        let runner = Runner::new(test_config("sleep 30", 50));
        let report = runner.run_with_registry(&registry, &[]).await.unwrap();

        match report.outcomes()[0].status() {
            crate::report::ScenarioStatus::Failed { message } => {
                assert!(message.contains("probe failed"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finalize_runs_exactly_once_when_run_fails() {
        let (ran, finalized) = counters();
        let mut registry = ScenarioRegistry::new();
        let (r, f) = (ran.clone(), finalized.clone());
        registry.register("fails", move || {
            Ok(Box::new(ProbeScenario::failing(&r, &f)) as Box<dyn Scenario>)
        });

        let runner = Runner::new(test_config("sleep 30", 50));
        runner.run_with_registry(&registry, &[]).await.unwrap();

        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_failure_skips_run_but_not_finalize() {
        let (ran, finalized) = counters();
        let mut registry = ScenarioRegistry::new();
        let (r, f) = (ran.clone(), finalized.clone());
        registry.register("bad_init", move || {
            Ok(Box::new(ProbeScenario {
                fail: false,
                fail_init: true,
                ran: r.clone(),
                finalized: f.clone(),
            }) as Box<dyn Scenario>)
        });

        let runner = Runner::new(test_config("sleep 30", 50));
        let report = runner.run_with_registry(&registry, &[]).await.unwrap();

        assert!(!report.outcomes()[0].is_passed());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn daemon_startup_failure_aborts_before_any_scenario() {
        let (ran, finalized) = counters();
        let mut registry = ScenarioRegistry::new();
        let (r, f) = (ran.clone(), finalized.clone());
        registry.register("never_runs", move || {
            Ok(Box::new(ProbeScenario::passing(&r, &f)) as Box<dyn Scenario>)
        });

        let runner = Runner::new(test_config("echo doomed >&2; exit 3", 2000));
        let err = runner
            .run_with_registry(&registry, &[])
            .await
            .unwrap_err();

        match err {
            Error::DaemonStartup { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert!(stderr.contains("doomed"));
            }
            other => panic!("expected DaemonStartup, got {other:?}"),
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_scenario_records_an_unexpected_error() {
        let registry = ScenarioRegistry::new();
        let runner = Runner::new(test_config("sleep 30", 50));
        let report = runner
            .run_with_registry(&registry, &["nope".to_string()])
            .await
            .unwrap();

        assert_eq!(report.executed(), 1);
        match report.outcomes()[0].status() {
            crate::report::ScenarioStatus::Error { message } => {
                assert!(message.contains("nope"));
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn explicit_names_run_in_supplied_order() {
        let (ran, finalized) = counters();
        let mut registry = ScenarioRegistry::new();
        for name in ["one", "two", "three"] {
            let (r, f) = (ran.clone(), finalized.clone());
            registry.register(name, move || {
                Ok(Box::new(ProbeScenario::passing(&r, &f)) as Box<dyn Scenario>)
            });
        }

        let runner = Runner::new(test_config("sleep 30", 50));
        let names = vec!["three".to_string(), "one".to_string()];
        let report = runner.run_with_registry(&registry, &names).await.unwrap();

        let executed: Vec<_> = report.outcomes().iter().map(|o| o.name()).collect();
        assert_eq!(executed, vec!["three", "one"]);
    }

    #[tokio::test]
    async fn readiness_probe_gates_the_run() {
        let mut config = test_config("sleep 30", 50);
        config.daemon.ready = Some(ReadyProbe {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 1".to_string()],
            attempts: 2,
            interval_ms: 10,
        });

        let runner = Runner::new(config);
        let err = runner
            .run_with_registry(&ScenarioRegistry::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DaemonNotReady { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn readiness_probe_success_lets_the_run_proceed() {
        let mut config = test_config("sleep 30", 50);
        config.daemon.ready = Some(ReadyProbe {
            program: "true".to_string(),
            args: Vec::new(),
            attempts: 3,
            interval_ms: 10,
        });

        let runner = Runner::new(config);
        let report = runner
            .run_with_registry(&ScenarioRegistry::new(), &[])
            .await
            .unwrap();
        assert_eq!(report.executed(), 0);
        assert!(report.all_passed());
    }
}
