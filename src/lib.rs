use std::sync::Arc;

use config::Config;
use database::Store;
use database::operations::{
    BookOperation, GoogleBooksClient, GroupOperation, ShelfOperation, SocialOperation,
    TopicOperation, UserOperation,
};

pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub catalog: GoogleBooksClient,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Result<Self, reqwest::Error> {
        let catalog = GoogleBooksClient::new(
            &config.google_books_api_url,
            config.external_lookup_timeout(),
        )?;
        Ok(Self {
            store,
            config,
            catalog,
        })
    }

    pub fn users(&self) -> UserOperation {
        UserOperation::new(self.store.clone(), self.config.bcrypt_cost)
    }

    pub fn books(&self) -> BookOperation {
        BookOperation::new(self.store.clone(), self.catalog.clone())
    }

    pub fn shelf(&self) -> ShelfOperation {
        ShelfOperation::new(self.store.clone())
    }

    pub fn social(&self) -> SocialOperation {
        SocialOperation::new(self.store.clone())
    }

    pub fn groups(&self) -> GroupOperation {
        GroupOperation::new(self.store.clone())
    }

    pub fn topics(&self) -> TopicOperation {
        TopicOperation::new(self.store.clone())
    }
}
