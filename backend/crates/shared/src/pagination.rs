//! Pagination primitives shared by list endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// `?limit=&offset=` query parameters.
///
/// Out-of-range limits are clamped rather than rejected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    #[inline]
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Apply to an already filtered, already ordered vector.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let total = items.len() as u64;
        let start = (self.offset() as usize).min(items.len());
        let end = start.saturating_add(self.limit() as usize).min(items.len());
        Page::new(items[start..end].to_vec(), total, *self)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, query: PageQuery) -> Self {
        Self {
            items,
            total,
            limit: query.limit(),
            offset: query.offset(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_clamps() {
        assert_eq!(PageQuery::default().limit(), DEFAULT_LIMIT);
        assert_eq!(PageQuery::new(0, 0).limit(), 1);
        assert_eq!(PageQuery::new(1000, 0).limit(), MAX_LIMIT);
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let items: Vec<u32> = (0..5).collect();
        let page = PageQuery::new(10, 10).slice(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn test_slice_window() {
        let items: Vec<u32> = (0..50).collect();
        let page = PageQuery::new(10, 15).slice(&items);
        assert_eq!(page.items.first(), Some(&15));
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.map(|n| n * 2).items[0], 30);
    }
}
