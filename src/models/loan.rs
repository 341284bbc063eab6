//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::Book;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub customer: String,
    pub email: String,
    pub loan_date: NaiveDate,
    pub returned: bool,
}

/// Loan with its book materialized for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub customer: String,
    pub email: String,
    pub loan_date: NaiveDate,
    pub returned: bool,
    pub book: Book,
}

impl LoanDetails {
    pub fn from_parts(loan: Loan, book: Book) -> Self {
        Self {
            id: loan.id,
            customer: loan.customer,
            email: loan.email,
            loan_date: loan.loan_date,
            returned: loan.returned,
            book,
        }
    }
}

/// New loan row, built by the service once the book is resolved
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub book_id: i32,
    pub customer: String,
    pub email: String,
    pub loan_date: NaiveDate,
}

/// Create loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    #[validate(length(min = 1, max = 20, message = "ISBN must be 1-20 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 100, message = "Customer must be 1-100 characters"))]
    pub customer: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Loan query parameters (API). A loan matches when its book's ISBN equals
/// `isbn` or its customer name contains `customer`; an absent criterion
/// matches nothing on its own side, and an empty filter returns everything.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub isbn: Option<String>,
    pub customer: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
