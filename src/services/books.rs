//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery, CreateBook, PageRequest, UpdateBook},
    repository::Repository,
};

use super::normalize_filter;

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        if self.repository.books.exists_by_isbn(&book.isbn).await? {
            return Err(AppError::Conflict("ISBN already registered".to_string()));
        }

        self.repository.books.insert(&book).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Update the display fields of a book
    pub async fn update_book(&self, id: i32, changes: UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, &changes).await
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// Search books with pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = PageRequest::new(query.page, query.page_size);

        self.repository
            .books
            .search(
                normalize_filter(query.title.as_deref()),
                normalize_filter(query.author.as_deref()),
                page,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::books::MockBookStore;
    use crate::repository::loans::MockLoanStore;

    fn service(books: MockBookStore) -> BooksService {
        BooksService::new(Repository::with_stores(
            Arc::new(books),
            Arc::new(MockLoanStore::new()),
        ))
    }

    fn create_request() -> CreateBook {
        CreateBook {
            isbn: "001".to_string(),
            title: "As aventuras".to_string(),
            author: "Artur".to_string(),
        }
    }

    #[tokio::test]
    async fn create_book_persists_new_isbn() {
        let mut books = MockBookStore::new();
        books
            .expect_exists_by_isbn()
            .withf(|isbn| isbn == "001")
            .returning(|_| Ok(false));
        books.expect_insert().returning(|book| {
            Ok(Book {
                id: 11,
                isbn: book.isbn.clone(),
                title: book.title.clone(),
                author: book.author.clone(),
            })
        });

        let book = service(books).create_book(create_request()).await.unwrap();

        assert_eq!(book.id, 11);
        assert_eq!(book.isbn, "001");
        assert_eq!(book.title, "As aventuras");
    }

    #[tokio::test]
    async fn create_book_rejects_duplicated_isbn() {
        let mut books = MockBookStore::new();
        books.expect_exists_by_isbn().returning(|_| Ok(true));
        books.expect_insert().times(0);

        let err = service(books).create_book(create_request()).await.unwrap_err();

        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "ISBN already registered"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn search_books_drops_blank_filters() {
        let mut books = MockBookStore::new();
        books
            .expect_search()
            .withf(|title, author, page| {
                title.as_deref() == Some("aventuras") && author.is_none() && page.page() == 0
            })
            .returning(|_, _, _| Ok((Vec::new(), 0)));

        let query = BookQuery {
            title: Some(" aventuras ".to_string()),
            author: Some("   ".to_string()),
            page: None,
            page_size: None,
        };

        let (items, total) = service(books).search_books(&query).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }
}
