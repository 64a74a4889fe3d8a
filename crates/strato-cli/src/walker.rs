//! Paginated collection walker.
//!
//! Collections arrive as linked [`Page`]s. [`pages`] exposes them as a lazy
//! stream that fetches a continuation link only when polled;
//! [`collect_all`] concatenates every page in server order and discards
//! everything on the first failure.

use std::future::Future;

use futures::{Stream, TryStreamExt, stream};
use strato_proto::Page;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CliError;

/// Fetches a continuation page by link.
pub trait PageFetcher<T>: Send + Sync {
    /// Fetch the page behind `link`.
    fn get_page(&self, link: &str) -> impl Future<Output = Result<Page<T>, CliError>> + Send;
}

enum Cursor<T> {
    First(Page<T>),
    Next(String),
    Done,
}

/// Stream the pages of a collection, starting from `first`.
///
/// `first` is yielded as given. Each continuation link is fetched once, when
/// the stream is polled for it. The stream ends after a page without a next
/// link, or right after yielding an error.
pub fn pages<'a, T, F>(
    first: Page<T>,
    fetcher: &'a F,
) -> impl Stream<Item = Result<Page<T>, CliError>> + 'a
where
    T: 'a,
    F: PageFetcher<T> + ?Sized,
{
    stream::try_unfold(Cursor::First(first), move |cursor| async move {
        let page = match cursor {
            Cursor::First(page) => page,
            Cursor::Next(link) => {
                debug!(link = %link, "Fetching next page");
                fetcher.get_page(&link).await?
            }
            Cursor::Done => return Ok(None),
        };
        let next = match page.next_link() {
            Some(link) => Cursor::Next(link.to_string()),
            None => Cursor::Done,
        };
        Ok::<_, CliError>(Some((page, next)))
    })
}

/// Collect every item of a collection, in page order.
///
/// # Errors
///
/// Returns the first page-fetch error; no partial result is returned.
pub async fn collect_all<T, F>(first: Page<T>, fetcher: &F) -> Result<Vec<T>, CliError>
where
    F: PageFetcher<T> + ?Sized,
{
    pages(first, fetcher)
        .try_fold(Vec::new(), |mut items, page| async move {
            items.extend(page.items);
            Ok(items)
        })
        .await
}

/// Await the first page, then collect the whole collection.
///
/// # Errors
///
/// Returns the error of the initial fetch or of any continuation fetch, or
/// [`CliError::Cancelled`] when `cancel` fires first.
pub async fn walk<T, F, Fut>(
    first: Fut,
    fetcher: &F,
    cancel: &CancellationToken,
) -> Result<Vec<T>, CliError>
where
    F: PageFetcher<T> + ?Sized,
    Fut: Future<Output = Result<Page<T>, CliError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CliError::Cancelled),
        result = async { collect_all(first.await?, fetcher).await } => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::StreamExt;

    /// Serves pages by link.
    struct LinkedPages {
        pages: HashMap<String, Result<Page<&'static str>, String>>,
        fetches: AtomicUsize,
    }

    impl LinkedPages {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn with(mut self, link: &str, page: Page<&'static str>) -> Self {
            self.pages.insert(link.to_string(), Ok(page));
            self
        }

        fn failing(mut self, link: &str) -> Self {
            self.pages
                .insert(link.to_string(), Err("connection reset".to_string()));
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl PageFetcher<&'static str> for LinkedPages {
        async fn get_page(&self, link: &str) -> Result<Page<&'static str>, CliError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(link) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(message)) => Err(CliError::Transport(message.clone())),
                None => Err(CliError::NotFound(link.to_string())),
            }
        }
    }

    fn three_pages() -> LinkedPages {
        LinkedPages::new()
            .with("/items", Page::with_next(vec!["a", "b"], "/items?p=2"))
            .with("/items?p=2", Page::with_next(vec!["c"], "/items?p=3"))
            .with("/items?p=3", Page::with_next(vec![], ""))
    }

    #[tokio::test]
    async fn walk_follows_links_in_order() {
        let fetcher = three_pages();
        let items = walk(
            fetcher.get_page("/items"),
            &fetcher,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(fetcher.fetches(), 3);
    }

    #[tokio::test]
    async fn failure_discards_partial_results() {
        let fetcher = LinkedPages::new()
            .with("/items", Page::with_next(vec!["a"], "/items?p=2"))
            .failing("/items?p=2");
        let result = walk(
            fetcher.get_page("/items"),
            &fetcher,
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(CliError::Transport(_))));
    }

    #[tokio::test]
    async fn walking_twice_fetches_twice() {
        let fetcher = three_pages();
        let cancel = CancellationToken::new();
        let first = walk(fetcher.get_page("/items"), &fetcher, &cancel)
            .await
            .unwrap();
        let second = walk(fetcher.get_page("/items"), &fetcher, &cancel)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.fetches(), 6);
    }

    #[tokio::test]
    async fn stream_is_lazy() {
        let fetcher = three_pages();
        let first = Page::with_next(vec!["a", "b"], "/items?p=2");
        let stream = pages(first, &fetcher);
        futures::pin_mut!(stream);

        let page = stream.next().await.unwrap().unwrap();
        assert_eq!(page.items, vec!["a", "b"]);
        assert_eq!(fetcher.fetches(), 0);

        let page = stream.next().await.unwrap().unwrap();
        assert_eq!(page.items, vec!["c"]);
        assert_eq!(fetcher.fetches(), 1);
    }

    #[tokio::test]
    async fn stream_ends_after_error() {
        let fetcher = LinkedPages::new().failing("/items?p=2");
        let stream = pages(Page::with_next(vec!["a"], "/items?p=2"), &fetcher);
        let results: Vec<_> = stream.collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn single_page_needs_no_fetch() {
        let fetcher = LinkedPages::new();
        let items = collect_all(Page::last(vec!["only"]), &fetcher)
            .await
            .unwrap();
        assert_eq!(items, vec!["only"]);
        assert_eq!(fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn cancelled_walk() {
        let fetcher = three_pages();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = walk(fetcher.get_page("/items"), &fetcher, &cancel).await;
        assert!(matches!(result, Err(CliError::Cancelled)));
    }
}
