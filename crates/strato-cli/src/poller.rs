//! Task completion poller.
//!
//! Mutating calls return a [`Task`] that the server advances on its own.
//! [`wait_for_task_completion`] fetches it until it reaches a terminal state
//! and classifies the outcome:
//!
//! | observed state         | outcome                          |
//! |------------------------|----------------------------------|
//! | `COMPLETED`            | `Ok(task)`                       |
//! | `ERROR`                | [`CliError::TaskFailed`]         |
//! | `QUEUED`, `STARTED`, `IN_PROGRESS` | sleep, fetch again   |
//! | anything else          | [`CliError::UnknownTaskState`]   |
//!
//! Fetch failures are returned as they are. Only pending states loop.
//!
//! The timeout bounds the whole wait, including a fetch that never answers.
//! A timeout before the first answer reports the state as `UNKNOWN`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use strato_proto::{Task, TaskState};
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CliError;

/// Default delay between two fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fetches a task by id.
pub trait TaskFetcher: Send + Sync {
    /// Fetch the current view of a task.
    fn get_task(&self, id: &str) -> impl Future<Output = Result<Task, CliError>> + Send;
}

/// State reported by a timeout that fires before any fetch answered.
const UNOBSERVED_STATE: &str = "UNKNOWN";

/// Callback invoked with every pending observation.
pub type ProgressFn = Arc<dyn Fn(&Task) + Send + Sync>;

/// How to poll.
#[derive(Clone)]
pub struct PollPolicy {
    /// Delay between fetches. Must be non-zero.
    pub interval: Duration,
    /// Upper bound on the total wait. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Called with each non-terminal task.
    pub on_progress: Option<ProgressFn>,
}

impl PollPolicy {
    /// Set the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, on_progress: impl Fn(&Task) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }

    /// Check the policy before use.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for a zero interval.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.interval.is_zero() {
            return Err(CliError::Config(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            on_progress: None,
        }
    }
}

impl fmt::Debug for PollPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollPolicy")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Poll `task_id` until it completes.
///
/// Returns the completed task.
///
/// # Errors
///
/// - [`CliError::Config`] if the policy is invalid, before any fetch
/// - [`CliError::InvalidArgument`] for an empty task id
/// - [`CliError::TaskFailed`] when the task ends in `ERROR`
/// - [`CliError::UnknownTaskState`] for a state this client does not know
/// - [`CliError::TaskTimeout`] when the timeout elapses first
/// - [`CliError::Cancelled`] when `cancel` fires
/// - any error from the fetcher, unchanged
pub async fn wait_for_task_completion<F>(
    fetcher: &F,
    task_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Task, CliError>
where
    F: TaskFetcher + ?Sized,
{
    policy.validate()?;
    if task_id.is_empty() {
        return Err(CliError::InvalidArgument("task id cannot be empty".into()));
    }

    let deadline = policy.timeout.map(|t| Instant::now() + t);
    let mut last_state: Option<String> = None;

    loop {
        let task = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CliError::Cancelled),
            result = fetcher.get_task(task_id) => result?,
            () = expiry(deadline) => {
                return Err(CliError::TaskTimeout {
                    task_id: task_id.to_string(),
                    last_state: last_state.unwrap_or_else(|| UNOBSERVED_STATE.to_string()),
                });
            }
        };
        debug!(task_id, state = %task.state, "Polled task");

        match &task.state {
            TaskState::Completed => {
                info!(task_id, operation = %task.operation, "Task completed");
                return Ok(task);
            }
            TaskState::Error => {
                return Err(CliError::TaskFailed {
                    task_id: task_id.to_string(),
                    operation: task.operation.clone(),
                    message: task.error_message(),
                });
            }
            TaskState::Unrecognized(state) => {
                return Err(CliError::UnknownTaskState {
                    task_id: task_id.to_string(),
                    state: state.clone(),
                });
            }
            TaskState::Queued | TaskState::Started | TaskState::InProgress => {}
        }

        if let Some(on_progress) = &policy.on_progress {
            on_progress(&task);
        }
        last_state = Some(task.state.to_string());

        let wait = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(CliError::TaskTimeout {
                        task_id: task_id.to_string(),
                        last_state: task.state.to_string(),
                    });
                }
                policy.interval.min(deadline - now)
            }
            None => policy.interval,
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CliError::Cancelled),
            () = sleep(wait) => {}
        }
    }
}

/// Resolves at `deadline`, or never without one.
async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Poll `task_id` until it completes and return the id of the entity it
/// acted upon. Tasks without an entity yield an empty string.
///
/// # Errors
///
/// Same as [`wait_for_task_completion`].
pub async fn wait_for_task<F>(
    fetcher: &F,
    task_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<String, CliError>
where
    F: TaskFetcher + ?Sized,
{
    let task = wait_for_task_completion(fetcher, task_id, policy, cancel).await?;
    Ok(task.entity.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    /// Serves a fixed sequence of task states, repeating the last one.
    struct ScriptedFetcher {
        states: Mutex<VecDeque<Result<TaskState, String>>>,
        fetches: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(states: &[&str]) -> Self {
            Self {
                states: Mutex::new(states.iter().map(|s| Ok(TaskState::from(*s))).collect()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                states: Mutex::new(VecDeque::from([Err(message.to_string())])),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl TaskFetcher for ScriptedFetcher {
        async fn get_task(&self, id: &str) -> Result<Task, CliError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut states = self.states.lock();
            let next = if states.len() > 1 {
                states.pop_front()
            } else {
                states.front().cloned()
            };
            match next {
                Some(Ok(state)) => {
                    Ok(Task::new(id, "CREATE_CLUSTER", state).with_entity("cluster", "c-1"))
                }
                Some(Err(message)) => Err(CliError::Transport(message)),
                None => Err(CliError::NotFound(id.to_string())),
            }
        }
    }

    /// Never answers, like a request to a controller that stopped responding.
    struct StalledFetcher;

    impl TaskFetcher for StalledFetcher {
        async fn get_task(&self, _id: &str) -> Result<Task, CliError> {
            std::future::pending().await
        }
    }

    /// Answers once, then stalls on every later fetch.
    struct StallsAfterFirst {
        fetches: AtomicUsize,
    }

    impl TaskFetcher for StallsAfterFirst {
        async fn get_task(&self, id: &str) -> Result<Task, CliError> {
            if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(Task::new(id, "CREATE_CLUSTER", TaskState::Started));
            }
            std::future::pending().await
        }
    }

    fn policy() -> PollPolicy {
        PollPolicy::default().with_interval(Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_entity_id_on_completion() {
        let fetcher = ScriptedFetcher::new(&["QUEUED", "STARTED", "COMPLETED"]);
        let id = wait_for_task(&fetcher, "t1", &policy(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id, "c-1");
        assert_eq!(fetcher.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_fails_without_further_fetches() {
        let fetcher = ScriptedFetcher::new(&["QUEUED", "ERROR", "COMPLETED"]);
        let err = wait_for_task(&fetcher, "t1", &policy(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::TaskFailed { ref operation, .. } if operation == "CREATE_CLUSTER"
        ));
        assert_eq!(fetcher.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_state_is_fatal() {
        let fetcher = ScriptedFetcher::new(&["QUEUED", "BOGUS"]);
        let err = wait_for_task(&fetcher, "t1", &policy(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::UnknownTaskState { ref state, .. } if state == "BOGUS"));
        assert_eq!(fetcher.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_not_retried() {
        let fetcher = ScriptedFetcher::failing("connection reset");
        let err = wait_for_task(&fetcher, "t1", &policy(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Transport(_)));
        assert_eq!(fetcher.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_last_state() {
        let fetcher = ScriptedFetcher::new(&["QUEUED", "IN_PROGRESS"]);
        let policy = PollPolicy::default()
            .with_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(5));
        let err = wait_for_task(&fetcher, "t1", &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            CliError::TaskTimeout {
                task_id,
                last_state,
            } => {
                assert_eq!(task_id, "t1");
                assert_eq!(last_state, "IN_PROGRESS");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Fetches at t = 0, 1, 2, 3, 4, 5.
        assert_eq!(fetcher.fetches(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_bounds_a_fetch_that_never_answers() {
        let policy = PollPolicy::default()
            .with_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(5));
        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            wait_for_task(&StalledFetcher, "t1", &policy, &CancellationToken::new()),
        )
        .await
        .expect("the poll timeout should fire first");

        match result {
            Err(CliError::TaskTimeout { last_state, .. }) => assert_eq!(last_state, "UNKNOWN"),
            other => panic!("unexpected result: {other:?}"),
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_fetch_timeout_reports_last_answered_state() {
        let fetcher = StallsAfterFirst {
            fetches: AtomicUsize::new(0),
        };
        let policy = PollPolicy::default()
            .with_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(5));
        let err = wait_for_task(&fetcher, "t1", &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::TaskTimeout { ref last_state, .. } if last_state == "STARTED"
        ));
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let fetcher = ScriptedFetcher::new(&["QUEUED"]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(35)).await;
            trigger.cancel();
        });

        let err = wait_for_task(&fetcher, "t1", &policy(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Cancelled));
        assert!(fetcher.fetches() >= 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_fetches() {
        let fetcher = ScriptedFetcher::new(&["COMPLETED"]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wait_for_task(&fetcher, "t1", &policy(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Cancelled));
        assert_eq!(fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected_before_fetching() {
        let fetcher = ScriptedFetcher::new(&["COMPLETED"]);
        let policy = PollPolicy::default().with_interval(Duration::ZERO);
        let err = wait_for_task(&fetcher, "t1", &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn empty_task_id_is_rejected() {
        let fetcher = ScriptedFetcher::new(&["COMPLETED"]);
        let err = wait_for_task(&fetcher, "", &policy(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_sees_each_pending_observation() {
        let fetcher = ScriptedFetcher::new(&["QUEUED", "STARTED", "IN_PROGRESS", "COMPLETED"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let policy = policy().with_progress(move |task| sink.lock().push(task.state.clone()));

        wait_for_task(&fetcher, "t1", &policy, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            *seen.lock(),
            vec![TaskState::Queued, TaskState::Started, TaskState::InProgress]
        );
    }

    #[test]
    fn policy_debug_hides_callback() {
        let policy = PollPolicy::default().with_progress(|_| {});
        let debug = format!("{policy:?}");
        assert!(debug.contains("on_progress: true"));
    }
}
