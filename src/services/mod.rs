//! Business logic services

pub mod books;
pub mod borrowings;
pub mod telegram;

use std::sync::Arc;

use crate::{config::TelegramConfig, error::AppResult, repository::Repository};

use telegram::{LogNotifier, Notifier, TelegramNotifier};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub books: books::BooksService,
    pub borrowings: borrowings::BorrowingsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, telegram_config: &TelegramConfig) -> AppResult<Self> {
        let notifier: Arc<dyn Notifier> = if telegram_config.is_enabled() {
            Arc::new(TelegramNotifier::new(telegram_config)?)
        } else {
            tracing::warn!("Telegram notifications disabled, messages will only be logged");
            Arc::new(LogNotifier)
        };

        Ok(Self {
            books: books::BooksService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(
                Arc::new(repository.borrowings.clone()),
                notifier,
            ),
            repository,
        })
    }
}
