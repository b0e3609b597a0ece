//! Provider poller - drives one job from submission to a result URL

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::provider::{
    GenerationJob, MediaProvider, PollPolicy, PollResult, ResultRef, Submission, TaskHandle,
};

/// Terminal outcome of one job
#[derive(Debug, Clone)]
pub struct Completion {
    pub result: ResultRef,
    /// Present only for asynchronous providers
    pub task_id: Option<String>,
    /// Status queries issued before the result appeared
    pub poll_attempts: u32,
}

/// Submit `job` and, for asynchronous providers, poll until it finishes.
///
/// A submission error returns immediately without a single poll.
pub async fn run(provider: &dyn MediaProvider, job: &GenerationJob) -> Result<Completion> {
    let kind = provider.kind();
    if !provider.is_configured() {
        return Err(AppError::ProviderNotConfigured(format!(
            "{} credentials are missing",
            kind
        )));
    }

    match provider.submit(job).await? {
        Submission::Completed(result) => {
            debug!(provider = %kind, "Provider answered synchronously");
            Ok(Completion {
                result,
                task_id: None,
                poll_attempts: 0,
            })
        }
        Submission::Task(task) => {
            let policy = provider.poll_policy();
            info!(
                provider = %kind,
                task_id = %task.task_id,
                max_attempts = policy.max_attempts,
                interval_ms = policy.interval.as_millis() as u64,
                "Task submitted, polling"
            );
            let (url, attempts) = poll_until_done(provider, &task, &policy).await?;
            Ok(Completion {
                result: ResultRef::new(url),
                task_id: Some(task.task_id),
                poll_attempts: attempts,
            })
        }
    }
}

/// Poll `task` until it succeeds, fails or the attempt budget runs out
pub async fn await_completion(
    provider: &dyn MediaProvider,
    task: &TaskHandle,
    policy: &PollPolicy,
) -> Result<String> {
    poll_until_done(provider, task, policy)
        .await
        .map(|(url, _)| url)
}

/// Each attempt sleeps `interval` first, then queries once. A query error
/// still consumes its attempt.
async fn poll_until_done(
    provider: &dyn MediaProvider,
    task: &TaskHandle,
    policy: &PollPolicy,
) -> Result<(String, u32)> {
    let kind = provider.kind();

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        match provider.poll(task, policy.request_timeout).await {
            Ok(PollResult::Succeeded { result_url }) => {
                info!(
                    provider = %kind,
                    task_id = %task.task_id,
                    attempt = attempt,
                    elapsed_ms = (chrono::Utc::now() - task.submitted_at).num_milliseconds(),
                    "Task completed"
                );
                return Ok((result_url, attempt));
            }
            Ok(PollResult::Failed { reason }) => {
                warn!(provider = %kind, task_id = %task.task_id, reason = %reason, "Task failed");
                return Err(AppError::generation(kind.as_str(), reason));
            }
            Ok(PollResult::Pending) => {
                debug!(
                    provider = %kind,
                    task_id = %task.task_id,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    "Task pending"
                );
            }
            Err(e) => {
                warn!(
                    provider = %kind,
                    task_id = %task.task_id,
                    attempt = attempt,
                    error = %e,
                    "Status query failed"
                );
            }
        }
    }

    warn!(
        provider = %kind,
        task_id = %task.task_id,
        attempts = policy.max_attempts,
        "Polling budget exhausted"
    );
    Err(AppError::GenerationTimedOut {
        provider: kind.to_string(),
        attempts: policy.max_attempts,
    })
}
