//! Oracle-driven code synthesis with a bounded execute/repair cycle.
//!
//! Drafting asks the oracle for a complete program from a statistical
//! summary of the dataset. Each candidate is run by an [`Executor`]; a
//! failure is the expected signal to re-ask the oracle with the captured
//! error, never an error to the caller. The loop performs at most
//! `max_attempts` executions and always terminates in `Accepted` or
//! `Exhausted`.

use anyhow::Result;
use tracing::{info, warn};

use crate::execution::{ExecutionResult, Executor};
use crate::llm::{ChatMessage, ChatOptions, OracleClient, Role};
use crate::role::{role_text, OracleRole};
use crate::utils::strip_code_fences;

/// A candidate program. `attempt` is 1-based; `repaired_from` carries the
/// failure output that triggered this regeneration.
#[derive(Debug, Clone)]
pub struct CodeCandidate {
    pub source: String,
    pub attempt: usize,
    pub repaired_from: Option<String>,
}

/// Terminal outcome of a synthesis run.
#[derive(Debug)]
pub enum Synthesis {
    Accepted(CodeCandidate),
    Exhausted(ExecutionResult),
}

/// Seam for the code-generation oracle, injected so the loop can be
/// exercised without network access.
pub trait CodeOracle {
    async fn draft(&self, summary: &str) -> Result<String>;
    async fn repair(
        &self,
        summary: &str,
        prior: &CodeCandidate,
        failure: &ExecutionResult,
    ) -> Result<String>;
}

pub async fn synthesize_and_run<O: CodeOracle, E: Executor>(
    oracle: &O,
    executor: &E,
    summary: &str,
    max_attempts: usize,
) -> Result<Synthesis> {
    anyhow::ensure!(max_attempts > 0, "max_attempts must be at least 1");

    let mut candidate = CodeCandidate {
        source: oracle.draft(summary).await?,
        attempt: 1,
        repaired_from: None,
    };

    loop {
        info!("executing candidate {}/{}", candidate.attempt, max_attempts);
        let result = executor.execute(&candidate.source).await?;
        if result.success {
            if candidate.repaired_from.is_some() {
                info!("candidate accepted after repair");
            }
            return Ok(Synthesis::Accepted(candidate));
        }
        if candidate.attempt >= max_attempts {
            return Ok(Synthesis::Exhausted(result));
        }
        warn!("candidate {} failed, requesting a repair", candidate.attempt);
        let source = oracle.repair(summary, &candidate, &result).await?;
        candidate = CodeCandidate {
            source,
            attempt: candidate.attempt + 1,
            repaired_from: Some(result.output),
        };
    }
}

fn draft_prompt(summary: &str) -> String {
    format!(
        "Write Python code to analyze the following dataset.\n\
         Data summary:\n{summary}\n\n\
         Requirements:\n\
         - Perform necessary data preprocessing.\n\
         - Explore the data and identify potential predictive models.\n\
         - Implement a suitable machine learning algorithm to make predictions.\n\
         - Generate relevant graphs to visualize the data and the model's performance.\n\
         - Ensure the code is runnable and includes necessary imports.\n\
         - Use pandas, numpy, scikit-learn, matplotlib, seaborn.\n\n\
         Output:\n\
         - The complete Python code as a string.\n"
    )
}

fn repair_prompt(summary: &str, prior: &CodeCandidate, failure: &ExecutionResult) -> String {
    format!(
        "{}\nPrevious code had the following error:\n{}\n\n\
         Current code:\n{}\n\n\
         Please correct the code to fix the error.\n",
        draft_prompt(summary),
        failure.output,
        prior.source,
    )
}

/// The production oracle: one-shot completions against the injected
/// client, with fences stripped off whatever comes back.
pub struct OracleCodegen<'a> {
    client: &'a OracleClient,
    opts: ChatOptions,
}

impl<'a> OracleCodegen<'a> {
    pub fn new(client: &'a OracleClient, opts: ChatOptions) -> Self {
        Self { client, opts }
    }

    async fn complete_code(&self, prompt: String) -> Result<String> {
        let messages = vec![
            ChatMessage::new(Role::System, role_text(OracleRole::CodeGen)),
            ChatMessage::new(Role::User, prompt),
        ];
        let text = self.client.complete(messages, self.opts.clone()).await?;
        Ok(strip_code_fences(&text))
    }
}

impl CodeOracle for OracleCodegen<'_> {
    async fn draft(&self, summary: &str) -> Result<String> {
        self.complete_code(draft_prompt(summary)).await
    }

    async fn repair(
        &self,
        summary: &str,
        prior: &CodeCandidate,
        failure: &ExecutionResult,
    ) -> Result<String> {
        self.complete_code(repair_prompt(summary, prior, failure)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct StubOracle;

    impl CodeOracle for StubOracle {
        async fn draft(&self, _summary: &str) -> Result<String> {
            Ok("draft".to_string())
        }

        async fn repair(
            &self,
            _summary: &str,
            prior: &CodeCandidate,
            _failure: &ExecutionResult,
        ) -> Result<String> {
            Ok(format!("repair-{}", prior.attempt))
        }
    }

    struct CountingExecutor {
        executions: AtomicUsize,
        succeed_on: Option<usize>,
    }

    impl CountingExecutor {
        fn failing() -> Self {
            Self { executions: AtomicUsize::new(0), succeed_on: None }
        }

        fn succeeding_on(n: usize) -> Self {
            Self { executions: AtomicUsize::new(0), succeed_on: Some(n) }
        }

        fn count(&self) -> usize {
            self.executions.load(Ordering::SeqCst)
        }
    }

    impl Executor for CountingExecutor {
        async fn execute(&self, _code: &str) -> Result<ExecutionResult> {
            let n = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
            if self.succeed_on == Some(n) {
                Ok(ExecutionResult { success: true, output: "done\n".into() })
            } else {
                Ok(ExecutionResult { success: false, output: format!("trace {}", n) })
            }
        }
    }

    #[tokio::test]
    async fn always_failing_exhausts_after_exactly_max_attempts() {
        let executor = CountingExecutor::failing();
        let outcome = synthesize_and_run(&StubOracle, &executor, "s", 3).await.unwrap();
        assert_eq!(executor.count(), 3);
        match outcome {
            Synthesis::Exhausted(last) => assert_eq!(last.output, "trace 3"),
            Synthesis::Accepted(_) => panic!("expected exhaustion"),
        }
    }

    #[tokio::test]
    async fn first_try_success_is_accepted_without_repair() {
        let executor = CountingExecutor::succeeding_on(1);
        let outcome = synthesize_and_run(&StubOracle, &executor, "s", 3).await.unwrap();
        assert_eq!(executor.count(), 1);
        match outcome {
            Synthesis::Accepted(candidate) => {
                assert_eq!(candidate.source, "draft");
                assert_eq!(candidate.attempt, 1);
                assert!(candidate.repaired_from.is_none());
            }
            Synthesis::Exhausted(_) => panic!("expected acceptance"),
        }
    }

    #[tokio::test]
    async fn repaired_candidate_carries_provenance() {
        let executor = CountingExecutor::succeeding_on(2);
        let outcome = synthesize_and_run(&StubOracle, &executor, "s", 3).await.unwrap();
        assert_eq!(executor.count(), 2);
        match outcome {
            Synthesis::Accepted(candidate) => {
                assert_eq!(candidate.source, "repair-1");
                assert_eq!(candidate.attempt, 2);
                assert_eq!(candidate.repaired_from.as_deref(), Some("trace 1"));
            }
            Synthesis::Exhausted(_) => panic!("expected acceptance"),
        }
    }

    #[tokio::test]
    async fn zero_budget_is_a_caller_error() {
        let executor = CountingExecutor::failing();
        assert!(synthesize_and_run(&StubOracle, &executor, "s", 0).await.is_err());
        assert_eq!(executor.count(), 0);
    }

    #[test]
    fn repair_prompt_includes_error_and_prior_code() {
        let prior = CodeCandidate {
            source: "import pandas".into(),
            attempt: 1,
            repaired_from: None,
        };
        let failure = ExecutionResult { success: false, output: "NameError: x".into() };
        let prompt = repair_prompt("summary", &prior, &failure);
        assert!(prompt.contains("NameError: x"));
        assert!(prompt.contains("import pandas"));
        assert!(prompt.contains("correct the code"));
    }
}
