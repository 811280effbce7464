// 话题操作
// 首帖随话题一起创建，回复只追加到末尾

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::AccountDirectory;
use crate::database::Store;
use crate::database::models::{GroupRef, NewPost, NewTopic, PostView, Topic, TopicView};
use crate::error::{AppError, AppResult};

const TOPIC_NOT_FOUND: &str = "Topic not found";

pub struct TopicOperation {
    store: Arc<dyn Store>,
}

impl TopicOperation {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 群组内的话题，最新创建的在前
    pub async fn list(&self, group_id: Uuid) -> AppResult<Vec<TopicView>> {
        let topics = self.store.list_topics(group_id).await?;
        let group = self.group_ref(group_id).await?;
        let directory = AccountDirectory::load(
            self.store.as_ref(),
            topics.iter().flat_map(Self::participants),
        )
        .await?;

        Ok(topics
            .into_iter()
            .map(|t| Self::resolve(t, group.clone(), &directory))
            .collect())
    }

    pub async fn create(
        &self,
        group_id: Uuid,
        author: Uuid,
        title: String,
        content: String,
    ) -> AppResult<TopicView> {
        let topic = NewTopic {
            group_id,
            author_id: author,
            title,
            content,
        }
        .validated()?;

        let topic = self.store.insert_topic(topic).await?;
        info!("用户 {} 在群组 {} 发起话题 {}", author, group_id, topic.id);
        self.view(topic).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<TopicView> {
        let topic = self.find(id).await?;
        self.view(topic).await
    }

    /// 追加回复，返回更新后的话题
    pub async fn reply(&self, id: Uuid, author: Uuid, content: String) -> AppResult<TopicView> {
        let post = NewPost {
            author_id: author,
            content,
        }
        .validated()?;

        if !self.store.append_post(id, post).await? {
            return Err(AppError::NotFound(TOPIC_NOT_FOUND.into()));
        }
        info!("用户 {} 回复了话题 {}", author, id);
        self.get(id).await
    }

    async fn find(&self, id: Uuid) -> AppResult<Topic> {
        self.store
            .find_topic(id)
            .await?
            .ok_or_else(|| AppError::NotFound(TOPIC_NOT_FOUND.into()))
    }

    async fn group_ref(&self, group_id: Uuid) -> AppResult<Option<GroupRef>> {
        Ok(self.store.find_group(group_id).await?.map(|g| GroupRef {
            id: g.id,
            name: g.name,
        }))
    }

    async fn view(&self, topic: Topic) -> AppResult<TopicView> {
        let group = self.group_ref(topic.group_id).await?;
        let directory =
            AccountDirectory::load(self.store.as_ref(), Self::participants(&topic)).await?;
        Ok(Self::resolve(topic, group, &directory))
    }

    fn participants(topic: &Topic) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(topic.author_id).chain(topic.posts.iter().map(|p| p.author_id))
    }

    fn resolve(topic: Topic, group: Option<GroupRef>, directory: &AccountDirectory) -> TopicView {
        TopicView {
            id: topic.id,
            group_id: topic.group_id,
            group,
            title: topic.title,
            author: directory.get(&topic.author_id),
            posts: topic
                .posts
                .into_iter()
                .map(|p| PostView {
                    author: directory.get(&p.author_id),
                    content: p.content,
                    created_at: p.created_at,
                })
                .collect(),
            created_at: topic.created_at,
            updated_at: topic.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::database::models::{NewAccountRecord, NewGroup};

    async fn account(store: &Arc<dyn Store>, name: &str) -> Uuid {
        store
            .insert_account(NewAccountRecord {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn replies_keep_insertion_order() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let topics = TopicOperation::new(store.clone());
        let alice = account(&store, "Alice").await;
        let bob = account(&store, "Bob").await;
        let group = store
            .insert_group(
                NewGroup {
                    name: "Classics".into(),
                    description: None,
                    tags: vec![],
                },
                alice,
            )
            .await
            .unwrap();

        let topic = topics
            .create(group.id, alice, "Favorite Classic?".into(), "Mine is Emma".into())
            .await
            .unwrap();
        assert_eq!(topic.posts.len(), 1);
        assert_eq!(topic.author.as_ref().map(|a| a.name.as_str()), Some("Alice"));

        topics.reply(topic.id, bob, "Dune".into()).await.unwrap();
        let topic = topics.reply(topic.id, alice, "Good pick".into()).await.unwrap();

        let thread: Vec<(String, String)> = topic
            .posts
            .iter()
            .map(|p| {
                (
                    p.author.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
                    p.content.clone(),
                )
            })
            .collect();
        assert_eq!(
            thread,
            vec![
                ("Alice".to_string(), "Mine is Emma".to_string()),
                ("Bob".to_string(), "Dune".to_string()),
                ("Alice".to_string(), "Good pick".to_string()),
            ]
        );
        assert_eq!(
            topic.group,
            Some(GroupRef {
                id: group.id,
                name: "Classics".into()
            })
        );
    }

    #[tokio::test]
    async fn reply_to_missing_topic() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let topics = TopicOperation::new(store);
        let err = topics
            .reply(Uuid::new_v4(), Uuid::new_v4(), "hello".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == TOPIC_NOT_FOUND));

        let empty = topics
            .reply(Uuid::new_v4(), Uuid::new_v4(), "   ".into())
            .await
            .unwrap_err();
        assert!(matches!(empty, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let topics = TopicOperation::new(store.clone());
        let alice = account(&store, "Alice").await;
        let group = Uuid::new_v4();

        topics
            .create(group, alice, "First".into(), "one".into())
            .await
            .unwrap();
        topics
            .create(group, alice, "Second".into(), "two".into())
            .await
            .unwrap();
        topics
            .create(Uuid::new_v4(), alice, "Elsewhere".into(), "three".into())
            .await
            .unwrap();

        let titles: Vec<String> = topics
            .list(group)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }
}
