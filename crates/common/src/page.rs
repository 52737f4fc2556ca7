//! Offset pagination shared by book and receipt listings.

use serde::{Deserialize, Serialize};

/// A one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Creates a page request. Returns `None` if either value is zero.
    pub fn new(page: u32, page_size: u32) -> Option<Self> {
        (page > 0 && page_size > 0).then_some(Self { page, page_size })
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Number of pages needed for `total` rows.
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    /// Slices an in-memory, already ordered collection.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_are_rejected() {
        assert!(PageRequest::new(0, 10).is_none());
        assert!(PageRequest::new(1, 0).is_none());
        assert!(PageRequest::new(1, 1).is_some());
    }

    #[test]
    fn test_offset_and_page_count() {
        let request = PageRequest::new(3, 10).unwrap();
        assert_eq!(request.offset(), 20);
        assert_eq!(request.page_count(21), 3);
        assert_eq!(request.page_count(0), 0);
    }

    #[test]
    fn test_from_sorted_slices_requested_window() {
        let page = Page::from_sorted((1..=25).collect(), PageRequest::new(3, 10).unwrap());
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = Page::from_sorted(vec![1, 2, 3], PageRequest::new(2, 10).unwrap());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }
}
