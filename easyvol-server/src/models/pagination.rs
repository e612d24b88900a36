//! Page/per-page pagination shared by every list endpoint

use serde::{Deserialize, Serialize};

const MAX_PER_PAGE: u32 = 100;
const DEFAULT_PER_PAGE: u32 = 20;

/// Validated pagination window (1-indexed page, per_page clamped to 1..=100)
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// SQL OFFSET for this window.
    pub fn offset(&self) -> u64 {
        ((self.page - 1) * self.per_page) as u64
    }

    /// SQL LIMIT for this window.
    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Response wrapper carrying the window and the overall total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    /// Map items into a response type, keeping the window.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Raw query parameters (`?page=2&per_page=50`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default, deserialize_with = "super::de::opt_u32")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "super::de::opt_u32")]
    pub per_page: Option<u32>,
}

impl From<PaginationParams> for Pagination {
    fn from(params: PaginationParams) -> Self {
        Self::new(
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
    }

    #[test]
    fn window_is_clamped() {
        let p = Pagination::new(0, 0);
        assert_eq!((p.page, p.per_page), (1, 1));

        let p = Pagination::new(1, 500);
        assert_eq!(p.per_page, 100);
    }

    #[test]
    fn map_keeps_window() {
        let page = Paginated {
            items: vec![1, 2, 3],
            total: 7,
            page: 2,
            per_page: 3,
        };
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.items, vec!["1", "2", "3"]);
        assert_eq!(mapped.total, 7);
        assert_eq!(mapped.page, 2);
    }

    #[test]
    fn params_default_to_first_page() {
        let p = Pagination::from(PaginationParams::default());
        assert_eq!((p.page, p.per_page), (1, 20));
    }
}
