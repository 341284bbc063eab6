//! Loans store for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{Book, Loan, LoanDetails, NewLoan, PageRequest},
};

/// Persistence contract for loans.
///
/// After creation the only writable column is `returned`; the contract
/// exposes no operation that could touch another field. A book can have at
/// most one open loan, which the backing schema enforces with a partial
/// unique index on `(book_id) WHERE NOT returned`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Persist a new loan; an open loan on the same book surfaces as Conflict
    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan>;
    /// Get loan by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Loan>;
    /// Get loan by ID with its book materialized
    async fn get_details_by_id(&self, id: i32) -> AppResult<LoanDetails>;
    /// Flip the returned flag of a loan
    async fn set_returned(&self, id: i32, returned: bool) -> AppResult<Loan>;
    /// Check whether the book has an open loan
    async fn exists_open_for_book(&self, book_id: i32) -> AppResult<bool>;
    /// Search loans whose book ISBN equals `isbn` or whose customer name
    /// contains `customer`, with pagination and the full-set count
    async fn search(
        &self,
        isbn: Option<String>,
        customer: Option<String>,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)>;
    /// Page through the loans of one book
    async fn find_by_book(&self, book_id: i32, page: PageRequest)
        -> AppResult<(Vec<LoanDetails>, i64)>;
    /// All open loans dated strictly before the cutoff
    async fn find_open_before(&self, cutoff: NaiveDate) -> AppResult<Vec<Loan>>;
}

#[derive(Clone)]
pub struct PgLoanStore {
    pool: Pool<Postgres>,
}

impl PgLoanStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn details_from_row(row: &PgRow) -> LoanDetails {
        LoanDetails {
            id: row.get("id"),
            customer: row.get("customer"),
            email: row.get("email"),
            loan_date: row.get("loan_date"),
            returned: row.get("returned"),
            book: Book {
                id: row.get("book_id"),
                isbn: row.get("isbn"),
                title: row.get("title"),
                author: row.get("author"),
            },
        }
    }
}

#[async_trait]
impl LoanStore for PgLoanStore {
    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, customer, email, loan_date, returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(&loan.customer)
        .bind(&loan.email)
        .bind(loan.loan_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            // The losing writer of a concurrent create lands here through
            // the partial unique index.
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Book already loaned".to_string())
            }
            other => AppError::Database(other),
        })
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn get_details_by_id(&self, id: i32) -> AppResult<LoanDetails> {
        let row = sqlx::query(
            r#"
            SELECT l.id, l.customer, l.email, l.loan_date, l.returned, l.book_id,
                   b.isbn, b.title, b.author
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        Ok(Self::details_from_row(&row))
    }

    async fn set_returned(&self, id: i32, returned: bool) -> AppResult<Loan> {
        // Re-opening a loan while the book has another open loan trips the
        // partial unique index, same as a conflicting insert.
        sqlx::query_as::<_, Loan>("UPDATE loans SET returned = $1 WHERE id = $2 RETURNING *")
            .bind(returned)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("Book already loaned".to_string())
                }
                other => AppError::Database(other),
            })?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn exists_open_for_book(&self, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND NOT returned)",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn search(
        &self,
        isbn: Option<String>,
        customer: Option<String>,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(isbn) = isbn {
            params.push(isbn);
            conditions.push(format!("b.isbn = ${}", params.len()));
        }

        if let Some(customer) = customer {
            params.push(format!("%{}%", customer.to_lowercase()));
            conditions.push(format!("LOWER(l.customer) LIKE ${}", params.len()));
        }

        // The criteria combine as OR: a loan qualifies through either side,
        // and no criteria at all means everything qualifies.
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" OR "))
        };

        let count_query = format!(
            "SELECT COUNT(*) FROM loans l JOIN books b ON l.book_id = b.id {}",
            where_clause
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT l.id, l.customer, l.email, l.loan_date, l.returned, l.book_id,
                   b.isbn, b.title, b.author
            FROM loans l
            JOIN books b ON l.book_id = b.id
            {}
            ORDER BY l.id
            LIMIT {} OFFSET {}
            "#,
            where_clause,
            page.size(),
            page.offset()
        );

        let mut select_builder = sqlx::query(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let rows = select_builder.fetch_all(&self.pool).await?;

        let loans = rows.iter().map(Self::details_from_row).collect();

        Ok((loans, total))
    }

    async fn find_by_book(
        &self,
        book_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            r#"
            SELECT l.id, l.customer, l.email, l.loan_date, l.returned, l.book_id,
                   b.isbn, b.title, b.author
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.book_id = $1
            ORDER BY l.id
            LIMIT {} OFFSET {}
            "#,
            page.size(),
            page.offset()
        );

        let rows = sqlx::query(&select_query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;

        let loans = rows.iter().map(Self::details_from_row).collect();

        Ok((loans, total))
    }

    async fn find_open_before(&self, cutoff: NaiveDate) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE NOT returned AND loan_date < $1 ORDER BY id",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }
}
