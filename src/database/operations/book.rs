// 图书目录操作
// 本地目录的增查，以及 Google Books 外部检索

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::database::models::{Book, BookImport, ExternalBook, NewBook, PageQuery};
use crate::database::{Store, StoreError};
use crate::error::{AppError, AppResult};

const UPSTREAM_FAILURE: &str = "Error fetching from Google Books";

/// 分页后的图书列表
#[derive(Debug, Serialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
    pub page: u32,
    pub pages: i64,
}

/// Google Books volumes 接口的响应，只保留用到的字段
#[derive(Debug, Default, Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
    published_date: Option<String>,
    average_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

/// publishedDate 可能是 "1965"、"2005-03" 或 "2005-03-01"
fn published_year(date: &str) -> Option<i32> {
    let digits: String = date.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn map_volume(volume: Volume) -> ExternalBook {
    let info = volume.volume_info;
    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Unknown Title".to_string());
    let author = if info.authors.is_empty() {
        "Unknown Author".to_string()
    } else {
        info.authors.join(", ")
    };
    ExternalBook {
        id: volume.id,
        title,
        author,
        description: info.description.unwrap_or_default(),
        cover_url: info
            .image_links
            .and_then(|links| links.thumbnail)
            .unwrap_or_default(),
        published_year: info.published_date.as_deref().and_then(published_year),
        average_rating: info.average_rating.unwrap_or(0.0),
        is_external: true,
    }
}

/// Google Books 客户端，结果不落库
#[derive(Clone)]
pub struct GoogleBooksClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<ExternalBook>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::ValidationFailed(
                "Query parameter \"q\" is required".into(),
            ));
        }

        let url = format!("{}/volumes", self.base_url);
        debug!("外部检索: {}", query);

        let response = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Google Books request failed: {}", e);
                AppError::UpstreamUnavailable(UPSTREAM_FAILURE.into())
            })?;

        let volumes: VolumeList = response.json().await.map_err(|e| {
            error!("Google Books response could not be decoded: {}", e);
            AppError::UpstreamUnavailable(UPSTREAM_FAILURE.into())
        })?;

        Ok(volumes.items.into_iter().map(map_volume).collect())
    }
}

/// 图书操作
pub struct BookOperation {
    store: Arc<dyn Store>,
    catalog: GoogleBooksClient,
}

impl BookOperation {
    pub fn new(store: Arc<dyn Store>, catalog: GoogleBooksClient) -> Self {
        Self { store, catalog }
    }

    pub async fn list(&self, query: PageQuery) -> AppResult<BookPage> {
        let page = query.validated()?;
        let (books, total) = self.store.list_books(&page).await?;
        Ok(BookPage {
            books,
            total,
            page: page.page,
            pages: page.pages(total),
        })
    }

    pub async fn create(&self, book: NewBook) -> AppResult<Book> {
        let book = book.validated()?;
        let book = self.store.insert_book(book).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                AppError::Conflict("A book with this googleId already exists".into())
            }
            other => other.into(),
        })?;
        info!("新增图书: {} ({})", book.title, book.id);
        Ok(book)
    }

    /// 按 googleId 幂等导入；返回的布尔值表示是否新建
    pub async fn import(&self, import: BookImport) -> AppResult<(Book, bool)> {
        let import = import.validated()?;
        let google_id = import.google_id.clone().unwrap_or_default();

        if let Some(existing) = self.store.find_book_by_google_id(&google_id).await? {
            return Ok((self.backfill(existing, &import).await?, false));
        }

        match self.store.insert_book(NewBook::from(import.clone())).await {
            Ok(book) => {
                info!("导入图书: {} ({})", book.title, google_id);
                Ok((book, true))
            }
            // 并发导入同一本书，以先写入者为准
            Err(StoreError::UniqueViolation(_)) => {
                let existing = self
                    .store
                    .find_book_by_google_id(&google_id)
                    .await?
                    .ok_or_else(|| AppError::Internal("imported book vanished".into()))?;
                Ok((self.backfill(existing, &import).await?, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 已有图书评分为 0 且导入数据带有正评分时回填
    async fn backfill(&self, book: Book, import: &BookImport) -> AppResult<Book> {
        match import.backfill_rating() {
            Some(rating) if book.average_rating == 0.0 => {
                debug!("回填图书 {} 的评分: {}", book.id, rating);
                Ok(self
                    .store
                    .set_book_average_rating(book.id, rating)
                    .await?
                    .unwrap_or(book))
            }
            _ => Ok(book),
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.store
            .find_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".into()))
    }

    pub async fn search_external(&self, query: &str) -> AppResult<Vec<ExternalBook>> {
        self.catalog.search(query).await
    }
}
