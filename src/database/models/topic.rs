use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountSummary, required_text};
use crate::error::AppResult;

/// 讨论话题，posts 只追加，保持插入顺序
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub author_id: Uuid,
    pub posts: Vec<Post>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub content: String,
}

impl NewTopic {
    pub fn validated(self) -> AppResult<Self> {
        Ok(Self {
            title: required_text("title", &self.title)?,
            content: required_text("content", &self.content)?,
            ..self
        })
    }
}

impl NewPost {
    pub fn validated(self) -> AppResult<Self> {
        Ok(Self {
            content: required_text("content", &self.content)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub author: Option<AccountSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 作者、回复者与所属群组已解析的话题
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub group: Option<GroupRef>,
    pub title: String,
    pub author: Option<AccountSummary>,
    pub posts: Vec<PostView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
