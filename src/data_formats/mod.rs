mod request;
mod response;

pub use request::*;
pub use response::*;

use crate::models::ArticleStatus;

/// 1-indexed page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: get_default_page_size(),
        }
    }
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Pages below 1 read as the first page.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit())
    }

    /// Negative sizes read as an empty page.
    pub fn limit(&self) -> i64 {
        self.page_size.max(0)
    }
}

/// Predicates accepted by the article list. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category_id: Option<u64>,
    pub status: Option<ArticleStatus>,
    pub author_id: Option<u64>,
    pub pinned: Option<bool>,
}

impl ArticleFilter {
    pub fn published_in_category(category_id: u64) -> Self {
        Self {
            category_id: Some(category_id),
            status: Some(ArticleStatus::Published),
            ..Self::default()
        }
    }
}

fn get_default_page_size() -> i64 {
    10
}
