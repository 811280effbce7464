// 数据库模块
// 持久化接口定义，以及 Postgres 与内存两种实现

pub mod memory;
pub mod models;
pub mod operations;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use models::{
    Account, AccountSummary, Book, Group, NewAccountRecord, NewBook, NewGroup, NewPost,
    NewShelfEntry, NewTopic, PageRequest, ProfileChanges, ShelfEntry, ShelfStatus, ShelfUpdate,
    Topic,
};

pub use memory::MemoryStore;
pub use postgres::{PgStore, connect};

/// 唯一约束名称，与迁移脚本中的定义一致
pub mod constraints {
    pub const ACCOUNT_EMAIL: &str = "accounts_email_key";
    pub const BOOK_GOOGLE_ID: &str = "books_google_id_key";
    pub const SHELF_USER_BOOK: &str = "shelf_entries_user_id_book_id_key";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 写入违反唯一约束
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// 存储中的数据无法还原为实体
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 文档存储接口：单条记录原子写入、复合唯一约束、按状态分组计数。
/// 跨记录的写入不保证原子性。
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // 账户
    async fn insert_account(&self, account: NewAccountRecord) -> StoreResult<Account>;
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn update_account_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Account>>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    /// 批量查询展示信息，不存在的ID被忽略，结果无序
    async fn account_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<AccountSummary>>;

    // 图书
    async fn insert_book(&self, book: NewBook) -> StoreResult<Book>;
    async fn find_book(&self, id: Uuid) -> StoreResult<Option<Book>>;
    async fn find_books(&self, ids: &[Uuid]) -> StoreResult<Vec<Book>>;
    async fn find_book_by_google_id(&self, google_id: &str) -> StoreResult<Option<Book>>;
    async fn set_book_average_rating(&self, id: Uuid, rating: f64) -> StoreResult<Option<Book>>;
    async fn list_books(&self, page: &PageRequest) -> StoreResult<(Vec<Book>, i64)>;

    // 书架
    async fn insert_shelf_entry(&self, entry: NewShelfEntry) -> StoreResult<ShelfEntry>;
    /// 仅当条目属于 owner 时更新
    async fn update_shelf_entry(
        &self,
        id: Uuid,
        owner: Uuid,
        update: &ShelfUpdate,
    ) -> StoreResult<Option<ShelfEntry>>;
    async fn delete_shelf_entry(&self, id: Uuid, owner: Uuid) -> StoreResult<bool>;
    /// 按 date_added 倒序
    async fn list_shelf_entries(
        &self,
        user: Uuid,
        status: Option<ShelfStatus>,
    ) -> StoreResult<Vec<ShelfEntry>>;
    async fn count_shelf_by_status(&self, user: Uuid) -> StoreResult<Vec<(ShelfStatus, i64)>>;

    // 关注关系，(follower, followee) 唯一
    async fn insert_follow(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool>;
    async fn delete_follow(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool>;
    async fn is_following(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool>;
    /// 按关注时间先后
    async fn follower_ids(&self, user: Uuid) -> StoreResult<Vec<Uuid>>;
    async fn following_ids(&self, user: Uuid) -> StoreResult<Vec<Uuid>>;

    // 群组
    async fn insert_group(&self, group: NewGroup, creator: Uuid) -> StoreResult<Group>;
    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>>;
    async fn add_group_member(&self, group: Uuid, user: Uuid) -> StoreResult<bool>;
    async fn remove_group_member(&self, group: Uuid, user: Uuid) -> StoreResult<bool>;
    /// 按创建时间倒序
    async fn list_groups(&self, page: &PageRequest) -> StoreResult<(Vec<Group>, i64)>;

    // 话题
    async fn insert_topic(&self, topic: NewTopic) -> StoreResult<Topic>;
    async fn find_topic(&self, id: Uuid) -> StoreResult<Option<Topic>>;
    /// 话题不存在时返回 false
    async fn append_post(&self, topic: Uuid, post: NewPost) -> StoreResult<bool>;
    /// 按创建时间倒序
    async fn list_topics(&self, group: Uuid) -> StoreResult<Vec<Topic>>;

    async fn close(&self) {}
}
