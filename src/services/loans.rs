//! Loan lifecycle service

use chrono::{Duration, Utc};

use crate::{
    config::LoanConfig,
    error::{AppError, AppResult},
    models::{CreateLoan, Loan, LoanDetails, LoanQuery, NewLoan, PageRequest},
    repository::Repository,
};

use super::normalize_filter;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoanConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoanConfig) -> Self {
        Self { repository, config }
    }

    /// Create a new loan for the book carrying the given ISBN.
    ///
    /// The loan starts today and open. A book with an open loan cannot be
    /// loaned again until that loan is returned.
    pub async fn create_loan(&self, request: CreateLoan) -> AppResult<LoanDetails> {
        let book = self
            .repository
            .books
            .get_by_isbn(&request.isbn)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found for passed ISBN".to_string()))?;

        if self.repository.loans.exists_open_for_book(book.id).await? {
            return Err(AppError::Conflict("Book already loaned".to_string()));
        }

        let loan = self
            .repository
            .loans
            .insert(&NewLoan {
                book_id: book.id,
                customer: request.customer,
                email: request.email,
                loan_date: Utc::now().date_naive(),
            })
            .await?;

        Ok(LoanDetails::from_parts(loan, book))
    }

    /// Get a loan with its book
    pub async fn get_loan(&self, id: i32) -> AppResult<LoanDetails> {
        self.repository.loans.get_details_by_id(id).await
    }

    /// Update the returned flag of a loan. No other loan field is mutable
    /// once the loan exists.
    pub async fn update_returned(&self, id: i32, returned: bool) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(id).await?;
        self.repository.loans.set_returned(loan.id, returned).await
    }

    /// Search loans by book ISBN or customer name
    pub async fn find_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let page = PageRequest::new(query.page, query.page_size);

        self.repository
            .loans
            .search(
                normalize_filter(query.isbn.as_deref()),
                normalize_filter(query.customer.as_deref()),
                page,
            )
            .await
    }

    /// Page through the loans of one book
    pub async fn get_loans_by_book(
        &self,
        book_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        // Verify book exists
        self.repository.books.get_by_id(book_id).await?;
        self.repository.loans.find_by_book(book_id, page).await
    }

    /// All open loans older than the configured overdue threshold.
    ///
    /// A loan dated exactly `overdue_days` ago is not late yet; detection is
    /// pure, so repeated calls without writes return the same set.
    pub async fn get_all_late_loans(&self) -> AppResult<Vec<Loan>> {
        let cutoff = Utc::now().date_naive() - Duration::days(self.config.overdue_days);
        self.repository.loans.find_open_before(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Book;
    use crate::repository::books::MockBookStore;
    use crate::repository::loans::MockLoanStore;

    fn service(books: MockBookStore, loans: MockLoanStore) -> LoansService {
        LoansService::new(
            Repository::with_stores(Arc::new(books), Arc::new(loans)),
            LoanConfig::default(),
        )
    }

    fn sample_book() -> Book {
        Book {
            id: 7,
            isbn: "123".to_string(),
            title: "As aventuras".to_string(),
            author: "Artur".to_string(),
        }
    }

    fn create_request() -> CreateLoan {
        CreateLoan {
            isbn: "123".to_string(),
            customer: "Fulano".to_string(),
            email: "fulano@example.com".to_string(),
        }
    }

    fn open_loan(id: i32) -> Loan {
        Loan {
            id,
            book_id: 7,
            customer: "Fulano".to_string(),
            email: "fulano@example.com".to_string(),
            loan_date: Utc::now().date_naive(),
            returned: false,
        }
    }

    #[tokio::test]
    async fn create_loan_starts_today_and_open() {
        let mut books = MockBookStore::new();
        books
            .expect_get_by_isbn()
            .withf(|isbn| isbn == "123")
            .returning(|_| Ok(Some(sample_book())));

        let mut loans = MockLoanStore::new();
        loans
            .expect_exists_open_for_book()
            .withf(|&book_id| book_id == 7)
            .returning(|_| Ok(false));
        loans
            .expect_insert()
            .withf(|new| {
                new.book_id == 7
                    && new.customer == "Fulano"
                    && new.loan_date == Utc::now().date_naive()
            })
            .returning(|new| {
                Ok(Loan {
                    id: 1,
                    book_id: new.book_id,
                    customer: new.customer.clone(),
                    email: new.email.clone(),
                    loan_date: new.loan_date,
                    returned: false,
                })
            });

        let details = service(books, loans)
            .create_loan(create_request())
            .await
            .unwrap();

        assert_eq!(details.id, 1);
        assert_eq!(details.customer, "Fulano");
        assert_eq!(details.loan_date, Utc::now().date_naive());
        assert!(!details.returned);
        assert_eq!(details.book.isbn, "123");
    }

    #[tokio::test]
    async fn create_loan_rejects_book_with_open_loan() {
        let mut books = MockBookStore::new();
        books
            .expect_get_by_isbn()
            .returning(|_| Ok(Some(sample_book())));

        let mut loans = MockLoanStore::new();
        loans
            .expect_exists_open_for_book()
            .returning(|_| Ok(true));
        loans.expect_insert().times(0);

        let err = service(books, loans)
            .create_loan(create_request())
            .await
            .unwrap_err();

        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "Book already loaned"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_loan_rejects_unknown_isbn() {
        let mut books = MockBookStore::new();
        books
            .expect_get_by_isbn()
            .withf(|isbn| isbn == "999")
            .returning(|_| Ok(None));

        let mut loans = MockLoanStore::new();
        loans.expect_exists_open_for_book().times(0);
        loans.expect_insert().times(0);

        let request = CreateLoan {
            isbn: "999".to_string(),
            customer: "Fulano".to_string(),
            email: "fulano@example.com".to_string(),
        };

        let err = service(books, loans).create_loan(request).await.unwrap_err();

        match err {
            AppError::NotFound(msg) => assert_eq!(msg, "Book not found for passed ISBN"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_returned_writes_only_the_flag() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_get_by_id()
            .withf(|&id| id == 1)
            .returning(|id| Ok(open_loan(id)));
        loans
            .expect_set_returned()
            .withf(|&id, &returned| id == 1 && returned)
            .returning(|id, returned| {
                let mut loan = open_loan(id);
                loan.returned = returned;
                Ok(loan)
            });

        let loan = service(MockBookStore::new(), loans)
            .update_returned(1, true)
            .await
            .unwrap();

        assert!(loan.returned);
        assert_eq!(loan.customer, "Fulano");
    }

    #[tokio::test]
    async fn update_returned_unknown_loan_is_not_found() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("Loan with id {} not found", id))));
        loans.expect_set_returned().times(0);

        let err = service(MockBookStore::new(), loans)
            .update_returned(42, true)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_loans_passes_filter_and_reports_full_total() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_search()
            .withf(|isbn, customer, page| {
                isbn.is_none()
                    && customer.as_deref() == Some("Fulano")
                    && page.page() == 0
                    && page.size() == 10
            })
            .returning(|_, customer, page| {
                let book = Book {
                    id: 7,
                    isbn: "123".to_string(),
                    title: "As aventuras".to_string(),
                    author: "Artur".to_string(),
                };
                let customer = customer.unwrap_or_default();
                let items = (1..=page.size())
                    .map(|i| LoanDetails {
                        id: i as i32,
                        customer: customer.clone(),
                        email: "fulano@example.com".to_string(),
                        loan_date: Utc::now().date_naive(),
                        returned: false,
                        book: book.clone(),
                    })
                    .collect();
                Ok((items, 15))
            });

        let query = LoanQuery {
            isbn: None,
            customer: Some("Fulano".to_string()),
            page: Some(0),
            page_size: Some(10),
        };

        let (items, total) = service(MockBookStore::new(), loans)
            .find_loans(&query)
            .await
            .unwrap();

        assert_eq!(items.len(), 10);
        assert_eq!(total, 15);
    }

    #[tokio::test]
    async fn find_loans_treats_blank_criteria_as_absent() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_search()
            .withf(|isbn, customer, _| isbn.is_none() && customer.is_none())
            .returning(|_, _, _| Ok((Vec::new(), 0)));

        let query = LoanQuery {
            isbn: Some("   ".to_string()),
            customer: Some(String::new()),
            page: None,
            page_size: None,
        };

        let (items, total) = service(MockBookStore::new(), loans)
            .find_loans(&query)
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn late_loans_cut_off_strictly_before_threshold() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_find_open_before()
            .withf(|&cutoff| cutoff == Utc::now().date_naive() - Duration::days(4))
            .returning(|cutoff| {
                let mut loan = open_loan(3);
                loan.loan_date = cutoff - Duration::days(1);
                Ok(vec![loan])
            });

        let late = service(MockBookStore::new(), loans)
            .get_all_late_loans()
            .await
            .unwrap();

        assert_eq!(late.len(), 1);
        assert_eq!(late[0].id, 3);
    }

    #[tokio::test]
    async fn loans_by_book_requires_known_book() {
        let mut books = MockBookStore::new();
        books
            .expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("Book with id {} not found", id))));

        let mut loans = MockLoanStore::new();
        loans.expect_find_by_book().times(0);

        let err = service(books, loans)
            .get_loans_by_book(99, PageRequest::new(None, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
