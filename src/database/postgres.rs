// Postgres 存储实现

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, FromRow};
use uuid::Uuid;

use super::models::{
    Account, AccountSummary, Book, Group, NewAccountRecord, NewBook, NewGroup, NewPost,
    NewShelfEntry, NewTopic, PageRequest, Post, ProfileChanges, ShelfEntry, ShelfStatus,
    ShelfUpdate, Topic,
};
use super::{Store, StoreError, StoreResult};
use crate::config::Config;

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, avatar, bio, last_login, created_at, updated_at";

const BOOK_COLUMNS: &str = "id, title, author, google_id, cover_url, description, genres, \
     published_year, average_rating, total_ratings, created_at, updated_at";

const SHELF_COLUMNS: &str =
    "id, user_id, book_id, status, rating, review, date_added, date_read, created_at, updated_at";

const GROUP_SELECT: &str = r#"
    SELECT
        g.id, g.name, g.description, g.tags, g.created_by, g.created_at, g.updated_at,
        COALESCE(
            (SELECT array_agg(m.user_id ORDER BY m.position)
             FROM group_members m WHERE m.group_id = g.id),
            '{}'::uuid[]
        ) AS members
    FROM groups g
"#;

/// 创建连接池，进程启动时调用一次
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(config.database_acquire_timeout())
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'bookshelf_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
}

#[derive(FromRow)]
struct ShelfEntryRow {
    id: Uuid,
    user_id: Uuid,
    book_id: Uuid,
    status: String,
    rating: Option<i32>,
    review: Option<String>,
    date_added: DateTime<Utc>,
    date_read: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShelfEntryRow> for ShelfEntry {
    type Error = StoreError;

    fn try_from(row: ShelfEntryRow) -> Result<Self, Self::Error> {
        Ok(ShelfEntry {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            status: parse_status(&row.status)?,
            rating: row.rating,
            review: row.review,
            date_added: row.date_added,
            date_read: row.date_read,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TopicRow {
    id: Uuid,
    group_id: Uuid,
    title: String,
    author_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PostRow {
    topic_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> StoreResult<ShelfStatus> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown shelf status '{}'", raw)))
}

/// LIKE 模式转义
fn like_pattern(search: &Option<String>) -> Option<String> {
    search.as_ref().map(|s| {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

/// 基于连接池的存储，连接按调用获取并归还
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 为话题行补齐帖子，帖子保持插入顺序
    async fn attach_posts(&self, rows: Vec<TopicRow>) -> StoreResult<Vec<Topic>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let posts = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT topic_id, author_id, content, created_at
            FROM topic_posts
            WHERE topic_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_topic: HashMap<Uuid, Vec<Post>> = HashMap::new();
        for post in posts {
            by_topic.entry(post.topic_id).or_default().push(Post {
                author_id: post.author_id,
                content: post.content,
                created_at: post.created_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Topic {
                posts: by_topic.remove(&row.id).unwrap_or_default(),
                id: row.id,
                group_id: row.group_id,
                title: row.title,
                author_id: row.author_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_account(&self, account: NewAccountRecord) -> StoreResult<Account> {
        let sql = format!(
            "INSERT INTO accounts (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(account.name)
            .bind(account.email)
            .bind(account.password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn update_account_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Account>> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                avatar = COALESCE($4, avatar),
                bio = COALESCE($5, bio),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.avatar.as_deref())
            .bind(changes.bio.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE accounts SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn account_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<AccountSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let summaries = sqlx::query_as::<_, AccountSummary>(
            "SELECT id, name, avatar FROM accounts WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn insert_book(&self, book: NewBook) -> StoreResult<Book> {
        let sql = format!(
            r#"
            INSERT INTO books (
                id, title, author, google_id, cover_url, description,
                genres, published_year, average_rating
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(Uuid::new_v4())
            .bind(book.title)
            .bind(book.author)
            .bind(book.google_id)
            .bind(book.cover_url.unwrap_or_default())
            .bind(book.description.unwrap_or_default())
            .bind(book.genres)
            .bind(book.published_year)
            .bind(book.average_rating.unwrap_or(0.0))
            .fetch_one(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_book(&self, id: Uuid) -> StoreResult<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_books(&self, ids: &[Uuid]) -> StoreResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM books WHERE id = ANY($1)", BOOK_COLUMNS);
        let books = sqlx::query_as::<_, Book>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_book_by_google_id(&self, google_id: &str) -> StoreResult<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE google_id = $1", BOOK_COLUMNS);
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn set_book_average_rating(&self, id: Uuid, rating: f64) -> StoreResult<Option<Book>> {
        let sql = format!(
            "UPDATE books SET average_rating = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .bind(rating)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list_books(&self, page: &PageRequest) -> StoreResult<(Vec<Book>, i64)> {
        let pattern = like_pattern(&page.search);
        let filter = "($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1 OR description ILIKE $1)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books WHERE {}", filter))
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM books WHERE {} ORDER BY created_at, id LIMIT $2 OFFSET $3",
            BOOK_COLUMNS, filter
        );
        let books = sqlx::query_as::<_, Book>(&sql)
            .bind(pattern.as_deref())
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    async fn insert_shelf_entry(&self, entry: NewShelfEntry) -> StoreResult<ShelfEntry> {
        let sql = format!(
            r#"
            INSERT INTO shelf_entries (id, user_id, book_id, status, rating, review, date_read)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SHELF_COLUMNS
        );
        let row = sqlx::query_as::<_, ShelfEntryRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.user_id)
            .bind(entry.book_id)
            .bind(entry.status.as_str())
            .bind(entry.rating)
            .bind(entry.review)
            .bind(entry.date_read)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn update_shelf_entry(
        &self,
        id: Uuid,
        owner: Uuid,
        update: &ShelfUpdate,
    ) -> StoreResult<Option<ShelfEntry>> {
        let sql = format!(
            r#"
            UPDATE shelf_entries
            SET status = COALESCE($3, status),
                rating = COALESCE($4, rating),
                review = COALESCE($5, review),
                date_read = COALESCE(date_read, $6),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            SHELF_COLUMNS
        );
        let row = sqlx::query_as::<_, ShelfEntryRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.rating)
            .bind(update.review.as_deref())
            .bind(update.mark_read_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ShelfEntry::try_from).transpose()
    }

    async fn delete_shelf_entry(&self, id: Uuid, owner: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM shelf_entries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_shelf_entries(
        &self,
        user: Uuid,
        status: Option<ShelfStatus>,
    ) -> StoreResult<Vec<ShelfEntry>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM shelf_entries
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY date_added DESC, seq DESC
            "#,
            SHELF_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShelfEntryRow>(&sql)
            .bind(user)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ShelfEntry::try_from).collect()
    }

    async fn count_shelf_by_status(&self, user: Uuid) -> StoreResult<Vec<(ShelfStatus, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM shelf_entries
            WHERE user_id = $1
            GROUP BY status
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| parse_status(&status).map(|s| (s, count)))
            .collect()
    }

    async fn insert_follow(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower)
        .bind(followee)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower)
            .bind(followee)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower)
        .bind(followee)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn follower_ids(&self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            "SELECT follower_id FROM follows WHERE followee_id = $1 ORDER BY created_at, follower_id",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn following_ids(&self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            "SELECT followee_id FROM follows WHERE follower_id = $1 ORDER BY created_at, followee_id",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_group(&self, group: NewGroup, creator: Uuid) -> StoreResult<Group> {
        let group_id = Uuid::new_v4();

        // 创建群组的同时把创建者加入群组
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, tags, created_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(group_id)
        .bind(group.name)
        .bind(group.description.unwrap_or_default())
        .bind(group.tags)
        .bind(creator)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
            .bind(group_id)
            .bind(creator)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_group(group_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("group {} vanished after insert", group_id)))
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let sql = format!("{} WHERE g.id = $1", GROUP_SELECT);
        let group = sqlx::query_as::<_, Group>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    async fn add_group_member(&self, group: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group)
        .bind(user)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE groups SET updated_at = NOW() WHERE id = $1")
                .bind(group)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn remove_group_member(&self, group: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group)
            .bind(user)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query("UPDATE groups SET updated_at = NOW() WHERE id = $1")
                .bind(group)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn list_groups(&self, page: &PageRequest) -> StoreResult<(Vec<Group>, i64)> {
        let pattern = like_pattern(&page.search);
        let filter = r#"
            ($1::text IS NULL
             OR g.name ILIKE $1
             OR g.description ILIKE $1
             OR EXISTS (SELECT 1 FROM unnest(g.tags) AS tag WHERE tag ILIKE $1))
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM groups g WHERE {}", filter))
                .bind(pattern.as_deref())
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "{} WHERE {} ORDER BY g.created_at DESC, g.id LIMIT $2 OFFSET $3",
            GROUP_SELECT, filter
        );
        let groups = sqlx::query_as::<_, Group>(&sql)
            .bind(pattern.as_deref())
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((groups, total))
    }

    async fn insert_topic(&self, topic: NewTopic) -> StoreResult<Topic> {
        let topic_id = Uuid::new_v4();

        // 话题与首帖一同写入
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO topics (id, group_id, title, author_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(topic_id)
        .bind(topic.group_id)
        .bind(topic.title)
        .bind(topic.author_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO topic_posts (topic_id, author_id, content) VALUES ($1, $2, $3)")
            .bind(topic_id)
            .bind(topic.author_id)
            .bind(topic.content)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_topic(topic_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("topic {} vanished after insert", topic_id)))
    }

    async fn find_topic(&self, id: Uuid) -> StoreResult<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, group_id, title, author_id, created_at, updated_at FROM topics WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_posts(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn append_post(&self, topic: Uuid, post: NewPost) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // 先锁定话题行，话题不存在则放弃写入
        let touched = sqlx::query("UPDATE topics SET updated_at = NOW() WHERE id = $1")
            .bind(topic)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO topic_posts (topic_id, author_id, content) VALUES ($1, $2, $3)")
            .bind(topic)
            .bind(post.author_id)
            .bind(post.content)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_topics(&self, group: Uuid) -> StoreResult<Vec<Topic>> {
        let rows = sqlx::query_as::<_, TopicRow>(
            r#"
            SELECT id, group_id, title, author_id, created_at, updated_at
            FROM topics
            WHERE group_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        self.attach_posts(rows).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(&None), None);
        assert_eq!(
            like_pattern(&Some("50%_off".into())).as_deref(),
            Some("%50\\%\\_off%")
        );
    }

    #[test]
    fn stored_status_must_be_known() {
        assert_eq!(parse_status("read").unwrap(), ShelfStatus::Read);
        assert!(matches!(
            parse_status("abandoned"),
            Err(StoreError::Corrupt(_))
        ));
    }
}
