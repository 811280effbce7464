// 书架操作
// 每个用户每本书只有一个条目，由存储层的唯一约束保证

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::database::models::shelf::{normalize_review, validate_rating};
use crate::database::models::{
    Book, NewShelfEntry, ShelfEntry, ShelfItem, ShelfStats, ShelfStatus, ShelfUpdate,
};
use crate::database::{Store, StoreError};
use crate::error::{AppError, AppResult};

const ITEM_NOT_FOUND: &str = "Bookshelf item not found";

pub struct ShelfOperation {
    store: Arc<dyn Store>,
}

impl ShelfOperation {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 添加到书架，同一本书重复添加返回冲突
    pub async fn add(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        status: ShelfStatus,
        rating: Option<i32>,
        review: Option<String>,
    ) -> AppResult<ShelfEntry> {
        let rating = validate_rating(rating)?;
        let date_read = (status == ShelfStatus::Read).then(Utc::now);

        let entry = self
            .store
            .insert_shelf_entry(NewShelfEntry {
                user_id,
                book_id,
                status,
                rating,
                review: normalize_review(review),
                date_read,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AppError::Conflict(
                    "You have already added this book to your shelf.".into(),
                ),
                other => other.into(),
            })?;

        info!("用户 {} 将图书 {} 加入书架 ({})", user_id, book_id, status);
        Ok(entry)
    }

    /// 部分更新；条目不存在或不属于调用者时一律返回未找到
    pub async fn update(
        &self,
        entry_id: Uuid,
        owner: Uuid,
        changes: ShelfUpdate,
    ) -> AppResult<ShelfEntry> {
        let update = ShelfUpdate {
            rating: validate_rating(changes.rating)?,
            review: normalize_review(changes.review),
            mark_read_at: (changes.status == Some(ShelfStatus::Read)).then(Utc::now),
            status: changes.status,
        };

        self.store
            .update_shelf_entry(entry_id, owner, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.into()))
    }

    pub async fn remove(&self, entry_id: Uuid, owner: Uuid) -> AppResult<()> {
        if self.store.delete_shelf_entry(entry_id, owner).await? {
            info!("用户 {} 移除了书架条目 {}", owner, entry_id);
            Ok(())
        } else {
            Err(AppError::NotFound(ITEM_NOT_FOUND.into()))
        }
    }

    /// 本人书架，最新添加的在前
    pub async fn list_for_owner(&self, user_id: Uuid) -> AppResult<Vec<ShelfItem>> {
        self.list_by_status_for_subject(user_id, None).await
    }

    /// 任意用户的书架，可按状态过滤；不存在的用户返回空列表
    pub async fn list_by_status_for_subject(
        &self,
        subject: Uuid,
        status: Option<ShelfStatus>,
    ) -> AppResult<Vec<ShelfItem>> {
        let entries = self.store.list_shelf_entries(subject, status).await?;
        self.with_books(entries).await
    }

    pub async fn stats_for_subject(&self, subject: Uuid) -> AppResult<ShelfStats> {
        let counts = self.store.count_shelf_by_status(subject).await?;
        Ok(ShelfStats::from_counts(counts))
    }

    async fn with_books(&self, entries: Vec<ShelfEntry>) -> AppResult<Vec<ShelfItem>> {
        let mut ids: Vec<Uuid> = entries.iter().map(|e| e.book_id).collect();
        ids.sort();
        ids.dedup();
        let books: HashMap<Uuid, Book> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find_books(&ids)
                .await?
                .into_iter()
                .map(|b| (b.id, b))
                .collect()
        };

        Ok(entries
            .into_iter()
            .map(|entry| {
                let book = books.get(&entry.book_id).cloned();
                ShelfItem::new(entry, book)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::database::models::NewBook;

    async fn setup() -> (Arc<dyn Store>, ShelfOperation, Book) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let book = store
            .insert_book(NewBook {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (store.clone(), ShelfOperation::new(store), book)
    }

    #[tokio::test]
    async fn adding_the_same_book_twice_conflicts() {
        let (_, shelf, book) = setup().await;
        let user = Uuid::new_v4();
        shelf
            .add(user, book.id, ShelfStatus::WantToRead, None, None)
            .await
            .unwrap();
        let err = shelf
            .add(user, book.id, ShelfStatus::Read, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // 其他用户不受影响
        shelf
            .add(Uuid::new_v4(), book.id, ShelfStatus::Read, None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rating_must_be_in_range() {
        let (_, shelf, book) = setup().await;
        let err = shelf
            .add(Uuid::new_v4(), book.id, ShelfStatus::Read, Some(6), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn marking_read_stamps_date_read() {
        let (_, shelf, book) = setup().await;
        let user = Uuid::new_v4();
        let entry = shelf
            .add(user, book.id, ShelfStatus::WantToRead, None, None)
            .await
            .unwrap();
        assert!(entry.date_read.is_none());

        let updated = shelf
            .update(
                entry.id,
                user,
                ShelfUpdate {
                    status: Some(ShelfStatus::Read),
                    rating: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ShelfStatus::Read);
        assert_eq!(updated.rating, Some(4));
        assert!(updated.date_read.is_some());

        let stats = shelf.stats_for_subject(user).await.unwrap();
        assert_eq!(stats.read, 1);
        assert_eq!(stats.want_to_read, 0);
    }

    #[tokio::test]
    async fn other_users_entries_look_missing() {
        let (_, shelf, book) = setup().await;
        let owner = Uuid::new_v4();
        let entry = shelf
            .add(owner, book.id, ShelfStatus::WantToRead, None, None)
            .await
            .unwrap();

        let stranger = Uuid::new_v4();
        let update = shelf
            .update(entry.id, stranger, ShelfUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(update, AppError::NotFound(msg) if msg == ITEM_NOT_FOUND));
        assert!(shelf.remove(entry.id, stranger).await.is_err());

        shelf.remove(entry.id, owner).await.unwrap();
        assert!(shelf.list_for_owner(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_resolves_books_and_filters_by_status() {
        let (store, shelf, book) = setup().await;
        let user = Uuid::new_v4();
        let other = store
            .insert_book(NewBook {
                title: "Emma".into(),
                author: "Jane Austen".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        shelf
            .add(user, book.id, ShelfStatus::Read, None, None)
            .await
            .unwrap();
        shelf
            .add(user, other.id, ShelfStatus::WantToRead, None, None)
            .await
            .unwrap();
        // 指向不存在图书的条目仍然返回，book 为空
        shelf
            .add(user, Uuid::new_v4(), ShelfStatus::Read, None, None)
            .await
            .unwrap();

        let all = shelf.list_for_owner(user).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].book.is_none());
        assert_eq!(all[1].book.as_ref().map(|b| b.title.as_str()), Some("Emma"));

        let read = shelf
            .list_by_status_for_subject(user, Some(ShelfStatus::Read))
            .await
            .unwrap();
        assert_eq!(read.len(), 2);
        assert!(read.iter().all(|item| item.status == ShelfStatus::Read));
    }
}
