//! Paginated collections.

use serde::{Deserialize, Serialize};

/// One page of a server-side collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page, in server order.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Continuation link for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_link: Option<String>,
    /// Link to the previous page. Carried for completeness, never followed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_page_link: Option<String>,
}

impl<T> Page<T> {
    /// A final page holding `items`.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_link: None,
            previous_page_link: None,
        }
    }

    /// A page holding `items` that continues at `link`.
    #[must_use]
    pub fn with_next(items: Vec<T>, link: impl Into<String>) -> Self {
        Self {
            items,
            next_page_link: Some(link.into()),
            previous_page_link: None,
        }
    }

    /// The continuation link, treating an empty string as absent.
    #[must_use]
    pub fn next_link(&self) -> Option<&str> {
        self.next_page_link.as_deref().filter(|link| !link.is_empty())
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::last(Vec::new())
    }
}
