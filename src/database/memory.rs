use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    Account, AccountSummary, Book, Group, NewAccountRecord, NewBook, NewGroup, NewPost,
    NewShelfEntry, NewTopic, PageRequest, Post, ProfileChanges, ShelfEntry, ShelfStatus,
    ShelfUpdate, Topic,
};
use super::{Store, StoreError, StoreResult, constraints};

#[derive(Default)]
struct Collections {
    accounts: Vec<Account>,
    books: Vec<Book>,
    shelf: Vec<ShelfEntry>,
    /// (follower, followee)，按建立顺序
    follows: Vec<(Uuid, Uuid)>,
    groups: Vec<Group>,
    topics: Vec<Topic>,
}

/// 进程内存储，约束与 Postgres 实现保持一致。
///
/// 用于测试和本地嵌入；所有集合位于同一把读写锁之后，
/// 单次调用内的写入是原子的。
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// 倒序遍历后按时间稳定排序，同一时间戳下新插入的在前
fn newest_first<T: Clone>(items: &[T], key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut sorted: Vec<T> = items.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted
}

fn paginate<T>(items: Vec<T>, page: &PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page_items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (page_items, total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_account(&self, account: NewAccountRecord) -> StoreResult<Account> {
        let mut data = self.data.write().await;
        if data.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation(constraints::ACCOUNT_EMAIL.into()));
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            avatar: String::new(),
            bio: String::new(),
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        data.accounts.push(account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let data = self.data.read().await;
        Ok(data.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let data = self.data.read().await;
        Ok(data.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn update_account_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Account>> {
        let mut data = self.data.write().await;
        if let Some(email) = &changes.email {
            if data.accounts.iter().any(|a| a.id != id && &a.email == email) {
                return Err(StoreError::UniqueViolation(constraints::ACCOUNT_EMAIL.into()));
            }
        }
        let Some(account) = data.accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            account.name = name.clone();
        }
        if let Some(email) = &changes.email {
            account.email = email.clone();
        }
        if let Some(avatar) = &changes.avatar {
            account.avatar = avatar.clone();
        }
        if let Some(bio) = &changes.bio {
            account.bio = bio.clone();
        }
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if let Some(account) = data.accounts.iter_mut().find(|a| a.id == id) {
            account.last_login = Some(at);
        }
        Ok(())
    }

    async fn account_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<AccountSummary>> {
        let data = self.data.read().await;
        Ok(data
            .accounts
            .iter()
            .filter(|a| ids.contains(&a.id))
            .map(AccountSummary::from)
            .collect())
    }

    async fn insert_book(&self, book: NewBook) -> StoreResult<Book> {
        let mut data = self.data.write().await;
        if let Some(google_id) = &book.google_id {
            if data
                .books
                .iter()
                .any(|b| b.google_id.as_ref() == Some(google_id))
            {
                return Err(StoreError::UniqueViolation(constraints::BOOK_GOOGLE_ID.into()));
            }
        }
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            google_id: book.google_id,
            cover_url: book.cover_url.unwrap_or_default(),
            description: book.description.unwrap_or_default(),
            genres: book.genres,
            published_year: book.published_year,
            average_rating: book.average_rating.unwrap_or(0.0),
            total_ratings: 0,
            created_at: now,
            updated_at: now,
        };
        data.books.push(book.clone());
        Ok(book)
    }

    async fn find_book(&self, id: Uuid) -> StoreResult<Option<Book>> {
        let data = self.data.read().await;
        Ok(data.books.iter().find(|b| b.id == id).cloned())
    }

    async fn find_books(&self, ids: &[Uuid]) -> StoreResult<Vec<Book>> {
        let data = self.data.read().await;
        Ok(data
            .books
            .iter()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn find_book_by_google_id(&self, google_id: &str) -> StoreResult<Option<Book>> {
        let data = self.data.read().await;
        Ok(data
            .books
            .iter()
            .find(|b| b.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn set_book_average_rating(&self, id: Uuid, rating: f64) -> StoreResult<Option<Book>> {
        let mut data = self.data.write().await;
        let Some(book) = data.books.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        book.average_rating = rating;
        book.updated_at = Utc::now();
        Ok(Some(book.clone()))
    }

    async fn list_books(&self, page: &PageRequest) -> StoreResult<(Vec<Book>, i64)> {
        let data = self.data.read().await;
        let needle = page.search.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<Book> = data
            .books
            .iter()
            .filter(|b| match &needle {
                Some(n) => {
                    contains_ignore_case(&b.title, n)
                        || contains_ignore_case(&b.author, n)
                        || contains_ignore_case(&b.description, n)
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn insert_shelf_entry(&self, entry: NewShelfEntry) -> StoreResult<ShelfEntry> {
        let mut data = self.data.write().await;
        if data
            .shelf
            .iter()
            .any(|e| e.user_id == entry.user_id && e.book_id == entry.book_id)
        {
            return Err(StoreError::UniqueViolation(constraints::SHELF_USER_BOOK.into()));
        }
        let now = Utc::now();
        let entry = ShelfEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            book_id: entry.book_id,
            status: entry.status,
            rating: entry.rating,
            review: entry.review,
            date_added: now,
            date_read: entry.date_read,
            created_at: now,
            updated_at: now,
        };
        data.shelf.push(entry.clone());
        Ok(entry)
    }

    async fn update_shelf_entry(
        &self,
        id: Uuid,
        owner: Uuid,
        update: &ShelfUpdate,
    ) -> StoreResult<Option<ShelfEntry>> {
        let mut data = self.data.write().await;
        let Some(entry) = data
            .shelf
            .iter_mut()
            .find(|e| e.id == id && e.user_id == owner)
        else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            entry.status = status;
        }
        if let Some(rating) = update.rating {
            entry.rating = Some(rating);
        }
        if let Some(review) = &update.review {
            entry.review = Some(review.clone());
        }
        if entry.date_read.is_none() {
            entry.date_read = update.mark_read_at;
        }
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn delete_shelf_entry(&self, id: Uuid, owner: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.shelf.len();
        data.shelf.retain(|e| !(e.id == id && e.user_id == owner));
        Ok(data.shelf.len() < before)
    }

    async fn list_shelf_entries(
        &self,
        user: Uuid,
        status: Option<ShelfStatus>,
    ) -> StoreResult<Vec<ShelfEntry>> {
        let data = self.data.read().await;
        let owned: Vec<ShelfEntry> = data
            .shelf
            .iter()
            .filter(|e| e.user_id == user && status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        Ok(newest_first(&owned, |e| e.date_added))
    }

    async fn count_shelf_by_status(&self, user: Uuid) -> StoreResult<Vec<(ShelfStatus, i64)>> {
        let data = self.data.read().await;
        let mut counts: Vec<(ShelfStatus, i64)> = Vec::new();
        for entry in data.shelf.iter().filter(|e| e.user_id == user) {
            match counts.iter_mut().find(|(s, _)| *s == entry.status) {
                Some((_, count)) => *count += 1,
                None => counts.push((entry.status, 1)),
            }
        }
        Ok(counts)
    }

    async fn insert_follow(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        if data.follows.contains(&(follower, followee)) {
            return Ok(false);
        }
        data.follows.push((follower, followee));
        Ok(true)
    }

    async fn delete_follow(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.follows.len();
        data.follows.retain(|edge| *edge != (follower, followee));
        Ok(data.follows.len() < before)
    }

    async fn is_following(&self, follower: Uuid, followee: Uuid) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data.follows.contains(&(follower, followee)))
    }

    async fn follower_ids(&self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        let data = self.data.read().await;
        Ok(data
            .follows
            .iter()
            .filter(|(_, followee)| *followee == user)
            .map(|(follower, _)| *follower)
            .collect())
    }

    async fn following_ids(&self, user: Uuid) -> StoreResult<Vec<Uuid>> {
        let data = self.data.read().await;
        Ok(data
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user)
            .map(|(_, followee)| *followee)
            .collect())
    }

    async fn insert_group(&self, group: NewGroup, creator: Uuid) -> StoreResult<Group> {
        let mut data = self.data.write().await;
        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name: group.name,
            description: group.description.unwrap_or_default(),
            tags: group.tags,
            members: vec![creator],
            created_by: creator,
            created_at: now,
            updated_at: now,
        };
        data.groups.push(group.clone());
        Ok(group)
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let data = self.data.read().await;
        Ok(data.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn add_group_member(&self, group: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let Some(group) = data.groups.iter_mut().find(|g| g.id == group) else {
            return Ok(false);
        };
        if group.members.contains(&user) {
            return Ok(false);
        }
        group.members.push(user);
        group.updated_at = Utc::now();
        Ok(true)
    }

    async fn remove_group_member(&self, group: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let Some(group) = data.groups.iter_mut().find(|g| g.id == group) else {
            return Ok(false);
        };
        let before = group.members.len();
        group.members.retain(|m| *m != user);
        let removed = group.members.len() < before;
        if removed {
            group.updated_at = Utc::now();
        }
        Ok(removed)
    }

    async fn list_groups(&self, page: &PageRequest) -> StoreResult<(Vec<Group>, i64)> {
        let data = self.data.read().await;
        let needle = page.search.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<Group> = data
            .groups
            .iter()
            .filter(|g| match &needle {
                Some(n) => {
                    contains_ignore_case(&g.name, n)
                        || contains_ignore_case(&g.description, n)
                        || g.tags.iter().any(|t| contains_ignore_case(t, n))
                }
                None => true,
            })
            .cloned()
            .collect();
        Ok(paginate(newest_first(&matching, |g| g.created_at), page))
    }

    async fn insert_topic(&self, topic: NewTopic) -> StoreResult<Topic> {
        let mut data = self.data.write().await;
        let now = Utc::now();
        let topic = Topic {
            id: Uuid::new_v4(),
            group_id: topic.group_id,
            title: topic.title,
            author_id: topic.author_id,
            posts: vec![Post {
                author_id: topic.author_id,
                content: topic.content,
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        };
        data.topics.push(topic.clone());
        Ok(topic)
    }

    async fn find_topic(&self, id: Uuid) -> StoreResult<Option<Topic>> {
        let data = self.data.read().await;
        Ok(data.topics.iter().find(|t| t.id == id).cloned())
    }

    async fn append_post(&self, topic: Uuid, post: NewPost) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let Some(topic) = data.topics.iter_mut().find(|t| t.id == topic) else {
            return Ok(false);
        };
        let now = Utc::now();
        topic.posts.push(Post {
            author_id: post.author_id,
            content: post.content,
            created_at: now,
        });
        topic.updated_at = now;
        Ok(true)
    }

    async fn list_topics(&self, group: Uuid) -> StoreResult<Vec<Topic>> {
        let data = self.data.read().await;
        let in_group: Vec<Topic> = data
            .topics
            .iter()
            .filter(|t| t.group_id == group)
            .cloned()
            .collect();
        Ok(newest_first(&in_group, |t| t.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(user: Uuid, book: Uuid, status: ShelfStatus) -> NewShelfEntry {
        NewShelfEntry {
            user_id: user,
            book_id: book,
            status,
            rating: None,
            review: None,
            date_read: None,
        }
    }

    #[tokio::test]
    async fn shelf_pair_is_unique() {
        let store = MemoryStore::new();
        let (user, book) = (Uuid::new_v4(), Uuid::new_v4());
        store
            .insert_shelf_entry(new_entry(user, book, ShelfStatus::WantToRead))
            .await
            .unwrap();
        let err = store
            .insert_shelf_entry(new_entry(user, book, ShelfStatus::Read))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(c) if c == constraints::SHELF_USER_BOOK));

        // 其他用户可以收藏同一本书
        store
            .insert_shelf_entry(new_entry(Uuid::new_v4(), book, ShelfStatus::Read))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn shelf_update_respects_owner() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let entry = store
            .insert_shelf_entry(new_entry(user, Uuid::new_v4(), ShelfStatus::WantToRead))
            .await
            .unwrap();
        let update = ShelfUpdate {
            status: Some(ShelfStatus::Read),
            ..Default::default()
        };
        assert!(
            store
                .update_shelf_entry(entry.id, Uuid::new_v4(), &update)
                .await
                .unwrap()
                .is_none()
        );
        let updated = store
            .update_shelf_entry(entry.id, user, &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ShelfStatus::Read);
        assert!(!store.delete_shelf_entry(entry.id, Uuid::new_v4()).await.unwrap());
        assert!(store.delete_shelf_entry(entry.id, user).await.unwrap());
    }

    #[tokio::test]
    async fn same_timestamp_entries_keep_insertion_order() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let entry = store
                .insert_shelf_entry(new_entry(user, Uuid::new_v4(), ShelfStatus::Read))
                .await
                .unwrap();
            ids.push(entry.id);
        }
        {
            let mut data = store.data.write().await;
            let stamp = data.shelf[0].date_added;
            for entry in data.shelf.iter_mut() {
                entry.date_added = stamp;
            }
        }
        let listed: Vec<Uuid> = store
            .list_shelf_entries(user, None)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn newest_shelf_entries_come_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let first = store
            .insert_shelf_entry(new_entry(user, Uuid::new_v4(), ShelfStatus::Read))
            .await
            .unwrap();
        let second = store
            .insert_shelf_entry(new_entry(user, Uuid::new_v4(), ShelfStatus::WantToRead))
            .await
            .unwrap();
        let listed = store.list_shelf_entries(user, None).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let read_only = store
            .list_shelf_entries(user, Some(ShelfStatus::Read))
            .await
            .unwrap();
        assert_eq!(read_only.len(), 1);
        assert_eq!(read_only[0].id, first.id);
    }

    #[tokio::test]
    async fn follow_edges_are_unique() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(store.insert_follow(a, b).await.unwrap());
        assert!(!store.insert_follow(a, b).await.unwrap());
        assert_eq!(store.follower_ids(b).await.unwrap(), vec![a]);
        assert_eq!(store.following_ids(a).await.unwrap(), vec![b]);
        assert!(store.delete_follow(a, b).await.unwrap());
        assert!(!store.delete_follow(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn email_is_unique() {
        let store = MemoryStore::new();
        let record = NewAccountRecord {
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "hash".into(),
        };
        store.insert_account(record.clone()).await.unwrap();
        assert!(matches!(
            store.insert_account(record).await,
            Err(StoreError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn group_search_matches_tags() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        store
            .insert_group(
                NewGroup {
                    name: "Sci-Fi Club".into(),
                    description: None,
                    tags: vec!["Space".into()],
                },
                creator,
            )
            .await
            .unwrap();
        store
            .insert_group(
                NewGroup {
                    name: "Poetry".into(),
                    description: Some("verse".into()),
                    tags: vec![],
                },
                creator,
            )
            .await
            .unwrap();

        let page = PageRequest {
            page: 1,
            limit: 20,
            search: Some("space".into()),
        };
        let (groups, total) = store.list_groups(&page).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(groups[0].name, "Sci-Fi Club");
    }
}
