//! Pagination parameters and results shared by every list endpoint

use serde::Serialize;

/// Largest page size accepted unless an endpoint sets its own limit
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters (1-indexed pages)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub per_page: u32,
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self::with_max(page, per_page, MAX_PAGE_SIZE)
    }

    /// Clamp `per_page` into `1..=max`
    pub fn with_max(page: u32, per_page: u32, max: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, max.max(1)),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Convert the items while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
