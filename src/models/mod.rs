//! Data models for Libellus

pub mod book;
pub mod loan;

// Re-export commonly used types
pub use book::{Book, BookQuery, CreateBook, UpdateBook};
pub use loan::{CreateLoan, Loan, LoanDetails, LoanQuery, NewLoan};

/// Zero-based page selection for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    size: i64,
}

impl PageRequest {
    pub const DEFAULT_SIZE: i64 = 20;
    pub const MAX_SIZE: i64 = 100;

    /// Build from raw query values. Negative pages clamp to 0, the size
    /// clamps to 1..=MAX_SIZE.
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(0).max(0),
            size: size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.page * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_offset() {
        let page = PageRequest::new(None, None);
        assert_eq!(page.page(), 0);
        assert_eq!(page.size(), PageRequest::DEFAULT_SIZE);
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(Some(3), Some(10));
        assert_eq!(page.offset(), 30);
    }

    #[test]
    fn page_request_clamps_bad_values() {
        let page = PageRequest::new(Some(-2), Some(0));
        assert_eq!(page.page(), 0);
        assert_eq!(page.size(), 1);

        let page = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(page.size(), PageRequest::MAX_SIZE);
    }
}
