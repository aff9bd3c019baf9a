//! Paginated list endpoints.
//!
//! List endpoints return one [`Page`] per request. A [`Paginator`] turns a
//! [`PageSource`] into either a single-page fetch or a lazy stream that walks
//! from page 1 until the reported total is exhausted. Each call to
//! [`Paginator::pages`] starts a fresh walk.

use async_trait::async_trait;
use futures::{Stream, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::error::{PromethiumError, PromethiumResult};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One page of a server-ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Upper bound on the item count across every page.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    /// Whether another page may hold items.
    ///
    /// An empty page always ends the walk, whatever `total` claims.
    pub fn has_more(&self) -> bool {
        !self.items.is_empty() && u64::from(self.page) * u64::from(self.size) < self.total
    }

    /// Number of the page after this one, if any.
    pub fn next_page(&self) -> Option<u32> {
        if self.has_more() {
            self.page.checked_add(1)
        } else {
            None
        }
    }

    /// Convert the items, keeping the envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

/// A list endpoint that can be fetched one page at a time.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Fetch page `page` (1-based) with `size` items per page.
    async fn fetch_page(&self, page: u32, size: u32) -> PromethiumResult<Page<Self::Item>>;
}

/// Single-page and whole-list access over a [`PageSource`].
#[derive(Debug, Clone)]
pub struct Paginator<S> {
    source: S,
    size: u32,
}

impl<S: PageSource> Paginator<S> {
    /// Wrap a source. A `size` of zero is rejected.
    pub fn new(source: S, size: u32) -> PromethiumResult<Self> {
        if size == 0 {
            return Err(PromethiumError::InvalidArgument(
                "page size must be at least 1".into(),
            ));
        }
        Ok(Self { source, size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Fetch exactly one page.
    pub async fn fetch(&self, page: u32) -> PromethiumResult<Page<S::Item>> {
        if page == 0 {
            return Err(PromethiumError::InvalidArgument(
                "page numbers start at 1".into(),
            ));
        }
        self.source.fetch_page(page, self.size).await
    }

    /// Lazily fetch pages from 1 onward, one request per item pulled.
    pub fn pages(&self) -> impl Stream<Item = PromethiumResult<Page<S::Item>>> + Send + '_ {
        stream::try_unfold(Some(1u32), move |next| async move {
            let Some(page) = next else {
                return Ok(None);
            };
            let fetched = self.source.fetch_page(page, self.size).await?;
            let next = fetched.next_page();
            Ok(Some((fetched, next)))
        })
    }

    /// Owning form of [`Paginator::pages`].
    pub fn into_pages(self) -> impl Stream<Item = PromethiumResult<Page<S::Item>>> + Send + 'static
    where
        S: 'static,
        S::Item: 'static,
    {
        self.into_pages_from(1)
    }

    /// Owning stream of pages from `start` onward. A `start` of zero yields
    /// one `InvalidArgument` error.
    pub fn into_pages_from(
        self,
        start: u32,
    ) -> impl Stream<Item = PromethiumResult<Page<S::Item>>> + Send + 'static
    where
        S: 'static,
        S::Item: 'static,
    {
        stream::try_unfold((self, Some(start)), |(paginator, next)| async move {
            let Some(page) = next else {
                return Ok(None);
            };
            let fetched = paginator.fetch(page).await?;
            let next = fetched.next_page();
            Ok(Some((fetched, (paginator, next))))
        })
    }

    /// Walk every page and concatenate the items.
    pub async fn collect_all(&self) -> PromethiumResult<Vec<S::Item>> {
        self.pages()
            .map_ok(|page| page.items)
            .try_concat()
            .await
    }
}
