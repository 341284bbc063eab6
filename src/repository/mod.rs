//! Repository layer for database operations

pub mod books;
pub mod loans;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::BookStore;
pub use loans::LoanStore;

/// Main repository struct holding the persistence stores
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    /// Create a repository backed by Postgres stores on the given pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBookStore::new(pool.clone())),
            loans: Arc::new(loans::PgLoanStore::new(pool)),
        }
    }

    /// Assemble a repository from explicit store implementations
    pub fn with_stores(books: Arc<dyn BookStore>, loans: Arc<dyn LoanStore>) -> Self {
        Self { books, loans }
    }
}
