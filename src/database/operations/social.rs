// 关注关系操作

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::AccountDirectory;
use crate::database::Store;
use crate::database::models::AccountSummary;
use crate::error::{AppError, AppResult};

pub struct SocialOperation {
    store: Arc<dyn Store>,
}

impl SocialOperation {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn ensure_account(&self, id: Uuid) -> AppResult<()> {
        match self.store.find_account(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".into())),
        }
    }

    /// 关注；重复关注不产生新的关系
    pub async fn follow(&self, actor: Uuid, target: Uuid) -> AppResult<()> {
        if actor == target {
            return Err(AppError::InvalidOperation("Cannot follow yourself".into()));
        }
        self.ensure_account(target).await?;

        if self.store.insert_follow(actor, target).await? {
            info!("用户 {} 关注了 {}", actor, target);
        }
        Ok(())
    }

    pub async fn unfollow(&self, actor: Uuid, target: Uuid) -> AppResult<()> {
        self.ensure_account(target).await?;

        if self.store.delete_follow(actor, target).await? {
            info!("用户 {} 取消关注 {}", actor, target);
        }
        Ok(())
    }

    pub async fn follow_status(&self, actor: Uuid, target: Uuid) -> AppResult<bool> {
        self.ensure_account(target).await?;
        Ok(self.store.is_following(actor, target).await?)
    }

    pub async fn followers(&self, user: Uuid) -> AppResult<Vec<AccountSummary>> {
        self.ensure_account(user).await?;
        let ids = self.store.follower_ids(user).await?;
        self.resolve(ids).await
    }

    pub async fn following(&self, user: Uuid) -> AppResult<Vec<AccountSummary>> {
        self.ensure_account(user).await?;
        let ids = self.store.following_ids(user).await?;
        self.resolve(ids).await
    }

    async fn resolve(&self, ids: Vec<Uuid>) -> AppResult<Vec<AccountSummary>> {
        let directory = AccountDirectory::load(self.store.as_ref(), ids.iter().copied()).await?;
        Ok(directory.resolve_all(&ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::database::models::NewAccountRecord;

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
    async fn follow_is_idempotent_and_reversible() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let social = SocialOperation::new(store.clone());
        let alice = account(&store, "Alice").await;
        let bob = account(&store, "Bob").await;

        social.follow(alice, bob).await.unwrap();
        social.follow(alice, bob).await.unwrap();

        let followers = social.followers(bob).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].name, "Alice");
        assert_eq!(social.following(alice).await.unwrap()[0].id, bob);
        assert!(social.follow_status(alice, bob).await.unwrap());
        assert!(!social.follow_status(bob, alice).await.unwrap());

        social.unfollow(alice, bob).await.unwrap();
        // 未关注时取消关注也成功
        social.unfollow(alice, bob).await.unwrap();
        assert!(social.followers(bob).await.unwrap().is_empty());
        assert!(social.following(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cannot_follow_self_or_missing_user() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let social = SocialOperation::new(store.clone());
        let alice = account(&store, "Alice").await;

        assert!(matches!(
            social.follow(alice, alice).await,
            Err(AppError::InvalidOperation(_))
        ));
        assert!(matches!(
            social.follow(alice, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            social.followers(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn followers_keep_follow_order() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let social = SocialOperation::new(store.clone());
        let target = account(&store, "Target").await;
        let carol = account(&store, "Carol").await;
        let dave = account(&store, "Dave").await;

        social.follow(dave, target).await.unwrap();
        social.follow(carol, target).await.unwrap();

        let names: Vec<String> = social
            .followers(target)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Dave", "Carol"]);
    }
}
