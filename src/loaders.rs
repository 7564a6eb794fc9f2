//! Loading/error/data state for screens that list or show backend records

use std::future::Future;

use log::error;

use crate::error::Result;
use crate::fetch::Paginated;

/// Records with a numeric primary key
pub trait Identified {
    fn id(&self) -> u64;
}

/// State behind an admin list screen.
///
/// Mutations mirror what the screen shows after a successful call: created
/// records go to the top, updated records are replaced in place and deleted
/// records disappear, with `total_count` adjusted to match.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub current_page: u32,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            current_page: 1,
            loading: false,
            error: None,
        }
    }
}

impl<T: Identified> ListState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetch` for `page`, recording the outcome
    pub async fn load<F, Fut>(&mut self, page: u32, fetch: F)
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<Paginated<T>>>,
    {
        self.loading = true;
        self.error = None;
        match fetch(page).await {
            Ok(result) => {
                self.items = result.results;
                self.total_count = result.count;
                self.current_page = page;
            }
            Err(e) => {
                error!("list load failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
    }

    /// Record the outcome of a mutation; the error message is kept on failure
    pub fn record<R>(&mut self, result: Result<R>) -> Option<R> {
        match result {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }

    /// Prepend a record created on the backend
    pub fn apply_created(&mut self, item: T) {
        self.items.insert(0, item);
        self.total_count += 1;
    }

    /// Replace the record with the same id
    pub fn apply_updated(&mut self, item: T) {
        if let Some(slot) = self.items.iter_mut().find(|i| i.id() == item.id()) {
            *slot = item;
        }
    }

    /// Drop the record with `id`
    pub fn apply_deleted(&mut self, id: u64) {
        let before = self.items.len();
        self.items.retain(|i| i.id() != id);
        if self.items.len() < before {
            self.total_count = self.total_count.saturating_sub(1);
        }
    }

    pub fn find(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|i| i.id() == id)
    }
}

/// Single value loaded from the backend
#[derive(Debug, Clone)]
pub struct Loadable<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> Loadable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetch`, keeping the previous data when it fails
    pub async fn load<Fut>(&mut self, fetch: Fut)
    where
        Fut: Future<Output = Result<T>>,
    {
        self.loading = true;
        self.error = None;
        match fetch.await {
            Ok(data) => self.data = Some(data),
            Err(e) => self.error = Some(e.to_string()),
        }
        self.loading = false;
    }
}
