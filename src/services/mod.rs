//! Business logic services

pub mod books;
pub mod email;
pub mod loans;
pub mod notifier;

use std::sync::Arc;

use crate::{
    config::{EmailConfig, LoanConfig},
    repository::Repository,
};

/// Treat blank filter values as absent
pub(crate) fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub mailer: Arc<dyn email::MailSender>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, email_config: EmailConfig, loan_config: LoanConfig) -> Self {
        Self {
            books: books::BooksService::new(repository.clone()),
            loans: loans::LoansService::new(repository, loan_config),
            mailer: Arc::new(email::SmtpMailer::new(email_config)),
        }
    }
}
