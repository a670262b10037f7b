//! Rule-based fake [`CommandRunner`] for tests.
//!
//! Register rules pairing a predicate over the [`ExecSpec`] with a canned
//! [`ExecOutput`]; the first matching rule wins. A rule can also carry a
//! side effect closure, used to materialize the on-disk artifacts a real
//! tool would leave behind (a clone destination, a plan file). Every
//! invocation is recorded so tests can assert which commands ran and, just
//! as importantly, which never did.
//!
//! ```rust,ignore
//! use keel::process::mock::MockRunner;
//! use keel::process::{CommandRunner, ExecOutput, ExecSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! let runner = MockRunner::new();
//! runner.on(|spec| spec.program == "git", ExecOutput::ok(""));
//!
//! let spec = ExecSpec::new("git").args(["--version"]);
//! let output = runner.run(spec, &CancellationToken::new()).await?;
//! assert!(output.success());
//! assert_eq!(runner.calls_for("git").len(), 1);
//! ```

use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::KeelError;
use crate::process::{CommandRunner, ExecOutput, ExecSpec};

type Matcher = Box<dyn Fn(&ExecSpec) -> bool + Send + Sync>;
type Effect = Box<dyn Fn(&ExecSpec) + Send + Sync>;

struct MockRule {
    matcher: Matcher,
    output: ExecOutput,
    effect: Option<Effect>,
}

/// Recorded invocation: program, argument vector and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Executable name the engine asked for.
    pub program: String,
    /// Arguments as passed.
    pub args: Vec<String>,
    /// Working directory the command would have run in.
    pub current_dir: Option<std::path::PathBuf>,
}

impl RecordedCall {
    /// Whether the call's first argument equals `operation`.
    #[must_use]
    pub fn is_operation(&self, operation: &str) -> bool {
        self.args.first().is_some_and(|arg| arg == operation)
    }
}

/// Fake command runner driven by match rules.
#[derive(Default)]
pub struct MockRunner {
    rules: Mutex<Vec<MockRule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRunner {
    /// New runner with no rules. Any invocation fails until rules are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule: when `matcher` accepts a spec, answer with `output`.
    pub fn on<F>(&self, matcher: F, output: ExecOutput)
    where
        F: Fn(&ExecSpec) -> bool + Send + Sync + 'static,
    {
        self.rules.lock().expect("mock rules poisoned").push(MockRule {
            matcher: Box::new(matcher),
            output,
            effect: None,
        });
    }

    /// Register a rule with a side effect executed before answering, used to
    /// create the files a real tool would have written.
    pub fn on_with_effect<F, E>(&self, matcher: F, output: ExecOutput, effect: E)
    where
        F: Fn(&ExecSpec) -> bool + Send + Sync + 'static,
        E: Fn(&ExecSpec) + Send + Sync + 'static,
    {
        self.rules.lock().expect("mock rules poisoned").push(MockRule {
            matcher: Box::new(matcher),
            output,
            effect: Some(Box::new(effect)),
        });
    }

    /// Every recorded invocation in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls poisoned").clone()
    }

    /// Recorded invocations of one program.
    #[must_use]
    pub fn calls_for(&self, program: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|call| call.program == program).collect()
    }

    /// Whether any recorded call of `program` had `operation` as its first
    /// argument.
    #[must_use]
    pub fn saw_operation(&self, program: &str, operation: &str) -> bool {
        self.calls_for(program).iter().any(|call| call.is_operation(operation))
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, spec: ExecSpec, cancel: &CancellationToken) -> Result<ExecOutput, KeelError> {
        if cancel.is_cancelled() {
            return Err(KeelError::Cancelled);
        }

        self.calls.lock().expect("mock calls poisoned").push(RecordedCall {
            program: spec.program.clone(),
            args: spec.args.clone(),
            current_dir: spec.current_dir.clone(),
        });

        let rules = self.rules.lock().expect("mock rules poisoned");
        for rule in rules.iter() {
            if (rule.matcher)(&spec) {
                if let Some(effect) = &rule.effect {
                    effect(&spec);
                }
                return Ok(rule.output.clone());
            }
        }
        Err(KeelError::CommandFailed {
            tool: spec.program.clone(),
            operation: spec.operation(),
            reason: "no mock rule matched".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let runner = MockRunner::new();
        runner.on(|spec| spec.operation() == "plan", ExecOutput::failure(2, ""));
        runner.on(|spec| spec.program == "terraform", ExecOutput::ok("fallback"));

        let plan = ExecSpec::new("terraform").args(["plan"]);
        let output = runner.run(plan, &CancellationToken::new()).await.unwrap();
        assert_eq!(output.exit_code, 2);

        let init = ExecSpec::new("terraform").args(["init"]);
        let output = runner.run(init, &CancellationToken::new()).await.unwrap();
        assert_eq!(output.stdout, "fallback");
    }

    #[tokio::test]
    async fn test_unmatched_invocation_fails() {
        let runner = MockRunner::new();
        let err =
            runner.run(ExecSpec::new("helm"), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, KeelError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_effect_runs_and_calls_are_recorded() {
        let temp = tempfile::tempdir().unwrap();
        let marker = temp.path().join("cloned");
        let marker_for_effect = marker.clone();

        let runner = MockRunner::new();
        runner.on_with_effect(
            |spec| spec.operation() == "clone",
            ExecOutput::ok(""),
            move |_spec| {
                std::fs::write(&marker_for_effect, "x").unwrap();
            },
        );

        let spec = ExecSpec::new("git").args(["clone", "url", "dest"]);
        runner.run(spec, &CancellationToken::new()).await.unwrap();

        assert!(marker.exists());
        assert!(runner.saw_operation("git", "clone"));
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls_for("terraform").is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let runner = MockRunner::new();
        runner.on(|_| true, ExecOutput::ok(""));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner.run(ExecSpec::new("git"), &cancel).await.unwrap_err();
        assert!(matches!(err, KeelError::Cancelled));
        assert!(runner.calls().is_empty());
    }
}
