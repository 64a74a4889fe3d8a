//! Property tests for task polling and page walking.
//!
//! These tests verify:
//! 1. The poller fetches once per observed state and stops at the first terminal one
//! 2. Unknown states are rejected without further fetches
//! 3. The walker yields every item once, in page order
//! 4. The walker fetches each continuation link once and stops at the first failure

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;
use strato_cli::CliError;
use strato_cli::poller::{PollPolicy, TaskFetcher, wait_for_task_completion};
use strato_cli::walker::{PageFetcher, collect_all};
use strato_proto::{Page, Task, TaskState};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

struct StateSequence {
    states: Mutex<VecDeque<TaskState>>,
    fetches: AtomicUsize,
}

impl StateSequence {
    fn new(states: Vec<TaskState>) -> Self {
        Self {
            states: Mutex::new(states.into()),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl TaskFetcher for StateSequence {
    async fn get_task(&self, id: &str) -> Result<Task, CliError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self
            .states
            .lock()
            .pop_front()
            .ok_or_else(|| CliError::Transport("fetched past the terminal state".into()))?;
        Ok(Task::new(id, "CREATE_CLUSTER", state).with_entity("cluster", "c-1"))
    }
}

struct LinkedPages {
    pages: HashMap<String, Page<u32>>,
    failing: Option<String>,
    fetched: Mutex<Vec<String>>,
}

impl LinkedPages {
    /// Split `items` into pages of the given sizes, linked `/items?page=N`.
    fn build(items: &[u32], sizes: &[usize]) -> (Page<u32>, Self) {
        let mut chunks: Vec<Vec<u32>> = Vec::new();
        let mut rest = items;
        for &size in sizes {
            let take = size.min(rest.len());
            chunks.push(rest[..take].to_vec());
            rest = &rest[take..];
        }
        if !rest.is_empty() || chunks.is_empty() {
            chunks.push(rest.to_vec());
        }

        let count = chunks.len();
        let mut pages = HashMap::new();
        let mut first = None;
        for (index, chunk) in chunks.into_iter().enumerate() {
            let page = if index + 1 < count {
                Page::with_next(chunk, format!("/items?page={}", index + 1))
            } else {
                Page::last(chunk)
            };
            if index == 0 {
                first = Some(page);
            } else {
                pages.insert(format!("/items?page={index}"), page);
            }
        }

        let walker = Self {
            pages,
            failing: None,
            fetched: Mutex::new(Vec::new()),
        };
        (first.unwrap(), walker)
    }
}

impl PageFetcher<u32> for LinkedPages {
    async fn get_page(&self, link: &str) -> Result<Page<u32>, CliError> {
        self.fetched.lock().push(link.to_string());
        if self.failing.as_deref() == Some(link) {
            return Err(CliError::Transport("connection reset".into()));
        }
        self.pages
            .get(link)
            .cloned()
            .ok_or_else(|| CliError::NotFound(link.to_string()))
    }
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn pending_state() -> impl Strategy<Value = TaskState> {
    prop_oneof![
        Just(TaskState::Queued),
        Just(TaskState::Started),
        Just(TaskState::InProgress),
    ]
}

fn terminal_state() -> impl Strategy<Value = TaskState> {
    prop_oneof![
        Just(TaskState::Completed),
        Just(TaskState::Error),
        "[A-Z]{3,10}"
            .prop_filter("must not be a known state", |s| {
                !matches!(
                    s.as_str(),
                    "QUEUED" | "STARTED" | "IN_PROGRESS" | "COMPLETED" | "ERROR"
                )
            })
            .prop_map(TaskState::Unrecognized),
    ]
}

// ============================================================================
// Poller
// ============================================================================

proptest! {
    #[test]
    fn test_poller_stops_at_first_terminal_state(
        pending in prop::collection::vec(pending_state(), 0..12),
        terminal in terminal_state(),
        trailing in prop::collection::vec(pending_state(), 0..3),
    ) {
        let mut states = pending.clone();
        states.push(terminal.clone());
        states.extend(trailing);
        let fetcher = StateSequence::new(states);
        let policy = PollPolicy::default().with_interval(Duration::from_secs(5));

        let result = paused_runtime().block_on(wait_for_task_completion(
            &fetcher,
            "task-1",
            &policy,
            &CancellationToken::new(),
        ));

        prop_assert_eq!(fetcher.fetches.load(Ordering::SeqCst), pending.len() + 1);
        match terminal {
            TaskState::Completed => {
                let task = result.unwrap();
                prop_assert_eq!(task.state, TaskState::Completed);
                prop_assert_eq!(task.entity.id, "c-1");
            }
            TaskState::Error => {
                let is_failed = matches!(result, Err(CliError::TaskFailed { .. }));
                prop_assert!(is_failed);
            }
            TaskState::Unrecognized(expected) => {
                let is_unknown = matches!(
                    result,
                    Err(CliError::UnknownTaskState { ref state, .. }) if *state == expected
                );
                prop_assert!(is_unknown);
            }
            _ => unreachable!("terminal_state yields terminal states only"),
        }
    }

    #[test]
    fn test_poller_timeout_bounds_fetches(
        pending in prop::collection::vec(pending_state(), 20..30),
        timeout_intervals in 1u64..10,
    ) {
        let fetcher = StateSequence::new(pending);
        let policy = PollPolicy::default()
            .with_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(timeout_intervals));

        let result = paused_runtime().block_on(wait_for_task_completion(
            &fetcher,
            "task-1",
            &policy,
            &CancellationToken::new(),
        ));

        let timed_out = matches!(result, Err(CliError::TaskTimeout { .. }));
        prop_assert!(timed_out);
        let fetches = fetcher.fetches.load(Ordering::SeqCst) as u64;
        prop_assert!(fetches >= timeout_intervals && fetches <= timeout_intervals + 1);
    }
}

// ============================================================================
// Walker
// ============================================================================

proptest! {
    #[test]
    fn test_walker_concatenates_pages_in_order(
        len in 0usize..60,
        sizes in prop::collection::vec(0usize..10, 0..8),
    ) {
        let items: Vec<u32> = (0..len as u32).collect();
        let (first, fetcher) = LinkedPages::build(&items, &sizes);
        let continuations = fetcher.pages.len();

        let runtime = paused_runtime();
        let collected = runtime
            .block_on(collect_all(first.clone(), &fetcher))
            .unwrap();

        prop_assert_eq!(&collected, &items);
        fetcher.fetched.lock().clear();
        let again = runtime.block_on(collect_all(first, &fetcher)).unwrap();
        prop_assert_eq!(again, collected);
        let fetched = fetcher.fetched.lock().clone();
        prop_assert_eq!(fetched.len(), continuations);
        let expected: Vec<String> = (1..=continuations).map(|n| format!("/items?page={n}")).collect();
        prop_assert_eq!(fetched, expected);
    }

    #[test]
    fn test_walker_discards_everything_on_failure(
        len in 1usize..40,
        sizes in prop::collection::vec(1usize..5, 2..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let items: Vec<u32> = (0..len as u32).collect();
        let (first, mut fetcher) = LinkedPages::build(&items, &sizes);
        prop_assume!(!fetcher.pages.is_empty());
        let failing_page = pick.index(fetcher.pages.len()) + 1;
        fetcher.failing = Some(format!("/items?page={failing_page}"));

        let result = paused_runtime().block_on(collect_all(first, &fetcher));

        let is_transport = matches!(result, Err(CliError::Transport(_)));
        prop_assert!(is_transport);
        prop_assert_eq!(fetcher.fetched.lock().len(), failing_page);
    }
}
