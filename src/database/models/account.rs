use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{bounded_text, required_text};
use crate::error::{AppError, AppResult};

const MAX_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 1000;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;

/// 账户实体，对应数据库中的 accounts 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: String,
    pub bio: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 对外展示的账户摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            avatar: account.avatar.clone(),
        }
    }
}

/// 本人可见的完整资料，包含由关注关系推导出的列表
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub account: Account,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
}

/// 公开资料，不含邮箱与密码
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<UserProfile> for PublicProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.account.id,
            name: profile.account.name,
            avatar: profile.account.avatar,
            bio: profile.account.bio,
            followers: profile.followers,
            following: profile.following,
            created_at: profile.account.created_at,
        }
    }
}

/// 注册输入
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// 已哈希密码、准备写入的账户
#[derive(Debug, Clone)]
pub struct NewAccountRecord {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// 个人资料修改，缺省字段保持不变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::ValidationFailed("email is required".into()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::ValidationFailed("email is invalid".into())),
    }
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = required_text("name", name)?;
    bounded_text("name", &name, MAX_NAME_LEN)
}

impl NewAccount {
    pub fn validated(self) -> AppResult<Self> {
        let len = self.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            return Err(AppError::ValidationFailed(format!(
                "password must be between {} and {} characters",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            )));
        }
        Ok(Self {
            name: validate_name(&self.name)?,
            email: normalize_email(&self.email)?,
            password: self.password,
        })
    }
}

impl ProfileChanges {
    pub fn validated(self) -> AppResult<Self> {
        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            email: self.email.as_deref().map(normalize_email).transpose()?,
            avatar: self.avatar.map(|a| a.trim().to_string()),
            bio: self
                .bio
                .as_deref()
                .map(|b| bounded_text("bio", b, MAX_BIO_LEN))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, email: &str, password: &str) -> NewAccount {
        NewAccount {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_is_normalized() {
        let account = registration("  Test user ", " Test@Example.com ", "password123")
            .validated()
            .unwrap();
        assert_eq!(account.name, "Test user");
        assert_eq!(account.email, "test@example.com");
        assert_eq!(account.password, "password123");
    }

    #[test]
    fn registration_requires_fields() {
        assert!(registration("", "a@b.c", "password123").validated().is_err());
        assert!(registration("Test", "", "password123").validated().is_err());
        assert!(registration("Test", "not-an-email", "password123").validated().is_err());
        assert!(registration("Test", "a@b.c", "short").validated().is_err());
    }

    #[test]
    fn profile_changes_only_check_present_fields() {
        let changes = ProfileChanges {
            bio: Some(" reader ".into()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(changes.bio.as_deref(), Some("reader"));
        assert!(changes.name.is_none());

        let bad = ProfileChanges {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(bad.validated(), Err(AppError::ValidationFailed(_))));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "$2b$04$hash".into(),
            avatar: String::new(),
            bio: String::new(),
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "test@example.com");
    }
}
