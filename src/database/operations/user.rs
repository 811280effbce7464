// 账户操作
// 注册、登录、个人资料

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::account::normalize_email;
use crate::database::models::{
    Account, NewAccount, NewAccountRecord, ProfileChanges, PublicProfile, UserProfile,
};
use crate::database::{Store, StoreError};
use crate::error::{AppError, AppResult};
use crate::utils::{hash_password, verify_password};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// 账户操作，处理所有与账户相关的业务
pub struct UserOperation {
    store: Arc<dyn Store>,
    bcrypt_cost: u32,
}

impl UserOperation {
    pub fn new(store: Arc<dyn Store>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// 注册新账户
    pub async fn register(&self, input: NewAccount) -> AppResult<Account> {
        let input = input.validated()?;

        if self.store.find_account_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".into()));
        }

        let cost = self.bcrypt_cost;
        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        let account = self
            .store
            .insert_account(NewAccountRecord {
                name: input.name,
                email: input.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AppError::Conflict("User already exists".into()),
                other => other.into(),
            })?;

        info!("新用户注册: {} ({})", account.id, account.email);
        Ok(account)
    }

    /// 邮箱密码登录，成功后记录登录时间
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Account> {
        let email =
            normalize_email(email).map_err(|_| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

        let Some(mut account) = self.store.find_account_by_email(&email).await? else {
            warn!("登录失败，邮箱不存在: {}", email);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        let password = password.to_string();
        let hash = account.password_hash.clone();
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?
            .unwrap_or(false);
        if !matched {
            warn!("登录失败，密码错误: {}", account.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let now = Utc::now();
        self.store.record_login(account.id, now).await?;
        account.last_login = Some(now);

        info!("用户 {} 登录成功", account.id);
        Ok(account)
    }

    /// 本人资料
    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let account = self
            .store
            .find_account(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        self.with_relations(account).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> AppResult<UserProfile> {
        let changes = changes.validated()?;

        if let Some(email) = &changes.email {
            if let Some(existing) = self.store.find_account_by_email(email).await? {
                if existing.id != user_id {
                    return Err(AppError::Conflict("Email is already taken".into()));
                }
            }
        }

        let account = self
            .store
            .update_account_profile(user_id, &changes)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    AppError::Conflict("Email is already taken".into())
                }
                other => other.into(),
            })?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        info!("用户 {} 更新了个人资料", user_id);
        self.with_relations(account).await
    }

    /// 他人可见的公开资料
    pub async fn public_profile(&self, user_id: Uuid) -> AppResult<PublicProfile> {
        self.profile(user_id).await.map(PublicProfile::from)
    }

    async fn with_relations(&self, account: Account) -> AppResult<UserProfile> {
        let followers = self.store.follower_ids(account.id).await?;
        let following = self.store.following_ids(account.id).await?;
        Ok(UserProfile {
            account,
            followers,
            following,
        })
    }
}
