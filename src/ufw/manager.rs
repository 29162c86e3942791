//! Operation surface of the ufw adapter.
//!
//! Each operation performs exactly one external invocation (status and rule
//! listing share a single `ufw status` call), run off the async dispatch
//! path with a bounded wait. The manager keeps no firewall state between
//! calls.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::ufw::exec::{CommandOutput, CommandRunner, ExecError};
use crate::ufw::parser;
use crate::ufw::{FirewallStatus, OperationResult, RuleSpec, RulesReport};

const CONFIRM: &str = "y\n";

const VALID_ACTIONS: [&str; 4] = ["allow", "deny", "reject", "limit"];

pub struct UfwManager<R: CommandRunner> {
    runner: Arc<R>,
    ufw_path: String,
    timeout: Duration,

    /// ufw gives no concurrency guarantees, so mutating operations are
    /// serialized here. Reads stay lock-free.
    mutation_lock: Mutex<()>,
}

impl<R: CommandRunner> UfwManager<R> {
    pub fn new(runner: R, ufw_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner: Arc::new(runner),
            ufw_path: ufw_path.into(),
            timeout,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Query the overall firewall state.
    pub async fn status(&self) -> FirewallStatus {
        match self.invoke(&["status"], None).await {
            Ok(output) => parser::parse_status(&output.stdout),
            Err(e) => {
                warn!("ufw status failed: {}", e);
                FirewallStatus::error(error_message(e))
            }
        }
    }

    /// Query the numbered rule table. One invocation; the same output text
    /// feeds both status and rule parsing.
    pub async fn rules(&self) -> RulesReport {
        match self.invoke(&["status"], None).await {
            Ok(output) => parser::parse_rules(&output.stdout),
            Err(e) => {
                warn!("ufw rule listing failed: {}", e);
                RulesReport::error(error_message(e))
            }
        }
    }

    /// Validate a rule request and translate it into a ufw invocation.
    pub async fn add_rule(&self, spec: &RuleSpec) -> OperationResult {
        if !VALID_ACTIONS.contains(&spec.action.as_str()) {
            return OperationResult::error("Invalid action");
        }

        let mut args: Vec<String> = vec![spec.action.clone()];

        // ufw infers the direction when the token is omitted; anything but
        // the two literals is dropped rather than rejected.
        if let Some(direction) = &spec.direction {
            if direction == "in" || direction == "out" {
                args.push(direction.clone());
            }
        }

        if let Some(source) = &spec.source_address {
            if !source.eq_ignore_ascii_case("any") {
                args.push("from".to_string());
                args.push(source.clone());
            }
        }

        args.push("to".to_string());
        args.push("any".to_string());

        if !spec.port.is_empty() {
            args.push("port".to_string());
            args.push(spec.port.clone());
        }

        if let Some(protocol) = &spec.protocol {
            args.push("proto".to_string());
            args.push(protocol.clone());
        }

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.mutate(&args, Some(CONFIRM)).await
    }

    /// Delete a rule by its current 1-based position. No existence check;
    /// ufw's own report is surfaced verbatim.
    pub async fn delete_rule(&self, rule_number: u32) -> OperationResult {
        let number = rule_number.to_string();
        self.mutate(&["delete", number.as_str()], Some(CONFIRM)).await
    }

    pub async fn enable(&self) -> OperationResult {
        self.mutate(&["enable"], Some(CONFIRM)).await
    }

    /// Disable does not prompt, so no stdin is fed.
    pub async fn disable(&self) -> OperationResult {
        self.mutate(&["disable"], None).await
    }

    async fn mutate(&self, args: &[&str], stdin: Option<&'static str>) -> OperationResult {
        let _guard = self.mutation_lock.lock().await;
        match self.invoke(args, stdin).await {
            Ok(output) => OperationResult::success(output.stdout.trim()),
            Err(e) => OperationResult::error(error_message(e)),
        }
    }

    async fn invoke(
        &self,
        args: &[&str],
        stdin: Option<&'static str>,
    ) -> Result<CommandOutput, ExecError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.ufw_path.clone());
        argv.extend(args.iter().map(|a| a.to_string()));
        debug!("invoking {:?}", argv);

        let runner = Arc::clone(&self.runner);
        let task = tokio::task::spawn_blocking(move || runner.run(&argv, stdin));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ExecError::Io(join_error.to_string())),
            Err(_) => Err(ExecError::Timeout(self.timeout)),
        }
    }
}

/// Map an execution failure to the message surfaced to callers. Non-zero
/// exits carry ufw's own stderr, which is the most actionable text there is.
fn error_message(error: ExecError) -> String {
    match error {
        ExecError::NonZeroExit { stderr } => stderr.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ufw::{ResultStatus, StatusKind};
    use std::sync::Mutex as StdMutex;

    /// Recording test double: captures every argv/stdin pair and replays a
    /// canned result.
    struct FakeRunner {
        reply: Result<CommandOutput, ExecError>,
        calls: StdMutex<Vec<(Vec<String>, Option<String>)>>,
    }

    impl FakeRunner {
        fn ok(stdout: &str) -> Self {
            Self::with(Ok(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
            }))
        }

        fn with(reply: Result<CommandOutput, ExecError>) -> Self {
            Self {
                reply,
                calls: StdMutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, args: &[String], stdin: Option<&str>) -> Result<CommandOutput, ExecError> {
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), stdin.map(str::to_string)));
            self.reply.clone()
        }
    }

    fn manager(runner: FakeRunner) -> UfwManager<FakeRunner> {
        UfwManager::new(runner, "/usr/sbin/ufw", Duration::from_secs(5))
    }

    fn calls(manager: &UfwManager<FakeRunner>) -> Vec<(Vec<String>, Option<String>)> {
        manager.runner.calls.lock().unwrap().clone()
    }

    fn spec(action: &str, port: &str) -> RuleSpec {
        RuleSpec {
            action: action.to_string(),
            port: port.to_string(),
            protocol: None,
            direction: None,
            source_address: None,
        }
    }

    #[tokio::test]
    async fn status_maps_active_output() {
        let m = manager(FakeRunner::ok("Status: active\n"));
        assert_eq!(m.status().await.status, StatusKind::Active);
        assert_eq!(calls(&m), vec![(
            vec!["/usr/sbin/ufw".to_string(), "status".to_string()],
            None,
        )]);
    }

    #[tokio::test]
    async fn status_not_found_maps_to_error_message() {
        let m = manager(FakeRunner::with(Err(ExecError::NotFound)));
        let status = m.status().await;
        assert_eq!(status.status, StatusKind::Error);
        assert_eq!(status.message.as_deref(), Some("ufw command not found"));
    }

    #[tokio::test]
    async fn rules_surfaces_stderr_on_failure() {
        let m = manager(FakeRunner::with(Err(ExecError::NonZeroExit {
            stderr: "ERROR: permission denied\n".to_string(),
        })));
        let report = m.rules().await;
        assert_eq!(report.status, StatusKind::Error);
        assert_eq!(report.message.as_deref(), Some("ERROR: permission denied"));
    }

    #[tokio::test]
    async fn add_rule_rejects_invalid_action_without_invoking() {
        let m = manager(FakeRunner::ok("unused"));
        let result = m.add_rule(&spec("bogus", "80")).await;
        assert_eq!(result, OperationResult::error("Invalid action"));
        assert!(calls(&m).is_empty());
    }

    #[tokio::test]
    async fn add_rule_default_direction_and_source_are_omitted() {
        let m = manager(FakeRunner::ok("Rule added\n"));
        let mut rule = spec("allow", "80");
        rule.protocol = Some("tcp".to_string());

        let result = m.add_rule(&rule).await;
        assert_eq!(result, OperationResult::success("Rule added"));
        assert_eq!(calls(&m), vec![(
            vec![
                "/usr/sbin/ufw".to_string(),
                "allow".to_string(),
                "to".to_string(),
                "any".to_string(),
                "port".to_string(),
                "80".to_string(),
                "proto".to_string(),
                "tcp".to_string(),
            ],
            Some("y\n".to_string()),
        )]);
    }

    #[tokio::test]
    async fn add_rule_full_argument_order() {
        let m = manager(FakeRunner::ok("Rule added"));
        let rule = RuleSpec {
            action: "deny".to_string(),
            port: "443".to_string(),
            protocol: Some("tcp".to_string()),
            direction: Some("out".to_string()),
            source_address: Some("10.0.0.5".to_string()),
        };

        m.add_rule(&rule).await;
        let (argv, _) = calls(&m).pop().unwrap();
        assert_eq!(
            argv,
            vec![
                "/usr/sbin/ufw", "deny", "out", "from", "10.0.0.5", "to", "any", "port", "443",
                "proto", "tcp",
            ]
        );
    }

    #[tokio::test]
    async fn add_rule_any_source_is_case_insensitive() {
        let m = manager(FakeRunner::ok(""));
        let mut rule = spec("allow", "80");
        rule.source_address = Some("Any".to_string());

        m.add_rule(&rule).await;
        let (argv, _) = calls(&m).pop().unwrap();
        assert!(!argv.contains(&"from".to_string()));
    }

    #[tokio::test]
    async fn add_rule_unrecognized_direction_is_dropped() {
        let m = manager(FakeRunner::ok(""));
        let mut rule = spec("allow", "80");
        rule.direction = Some("sideways".to_string());

        m.add_rule(&rule).await;
        let (argv, _) = calls(&m).pop().unwrap();
        assert_eq!(argv[1], "allow");
        assert_eq!(argv[2], "to");
    }

    #[tokio::test]
    async fn delete_rule_translates_number_and_confirms() {
        let m = manager(FakeRunner::ok("Rule deleted\n"));
        let result = m.delete_rule(3).await;
        assert_eq!(result, OperationResult::success("Rule deleted"));
        assert_eq!(calls(&m), vec![(
            vec![
                "/usr/sbin/ufw".to_string(),
                "delete".to_string(),
                "3".to_string(),
            ],
            Some("y\n".to_string()),
        )]);
    }

    #[tokio::test]
    async fn enable_confirms_disable_does_not() {
        let m = manager(FakeRunner::ok("done"));
        m.enable().await;
        m.disable().await;

        let recorded = calls(&m);
        assert_eq!(recorded[0].0[1..].to_vec(), vec!["enable".to_string()]);
        assert_eq!(recorded[0].1.as_deref(), Some("y\n"));
        assert_eq!(recorded[1].0[1..].to_vec(), vec!["disable".to_string()]);
        assert_eq!(recorded[1].1, None);
    }

    #[tokio::test]
    async fn mutations_report_not_found_uniformly() {
        let m = manager(FakeRunner::with(Err(ExecError::NotFound)));
        for result in [
            m.add_rule(&spec("allow", "80")).await,
            m.delete_rule(1).await,
            m.enable().await,
            m.disable().await,
        ] {
            assert_eq!(result.status, ResultStatus::Error);
            assert_eq!(result.message, "ufw command not found");
        }
    }

    #[tokio::test]
    async fn mutation_stderr_is_trimmed() {
        let m = manager(FakeRunner::with(Err(ExecError::NonZeroExit {
            stderr: "ERROR: Could not delete non-existent rule\n".to_string(),
        })));
        let result = m.delete_rule(99).await;
        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.message, "ERROR: Could not delete non-existent rule");
    }
}
