//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{CreateLoan, Loan, LoanDetails, LoanQuery, PageRequest},
};

use super::books::PaginatedResponse;

/// Update loan request; the returned flag is the only writable loan field
#[derive(Deserialize, ToSchema)]
pub struct UpdateLoanRequest {
    /// Whether the book came back to the library
    pub returned: bool,
}

/// Plain pagination query
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Create a new loan
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Book not found for passed ISBN"),
        (status = 409, description = "Book already loaned")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    request.validate()?;

    let loan = state.services.loans.create_loan(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Search loans by book ISBN or customer name
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(
        ("isbn" = Option<String>, Query, description = "Match the book's ISBN"),
        ("customer" = Option<String>, Query, description = "Search in customer name"),
        ("page" = Option<i64>, Query, description = "Page number (default: 0)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of loans", body = PaginatedResponse<LoanDetails>)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    let (items, total) = state.services.loans.find_loans(&query).await?;
    let page = PageRequest::new(query.page, query.page_size);

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page(),
        per_page: page.size(),
    }))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(loan))
}

/// Mark a loan returned (or open it again)
#[utoipa::path(
    patch,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = UpdateLoanRequest,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Book already loaned to someone else")
    )
)]
pub async fn update_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLoanRequest>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .loans
        .update_returned(id, request.returned)
        .await?;

    Ok(Json(loan))
}

/// List the loans of a specific book
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Book ID"),
        ("page" = Option<i64>, Query, description = "Page number (default: 0)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Loans of the book", body = PaginatedResponse<LoanDetails>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_loans(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    let page = PageRequest::new(query.page, query.page_size);
    let (items, total) = state.services.loans.get_loans_by_book(book_id, page).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page(),
        per_page: page.size(),
    }))
}
