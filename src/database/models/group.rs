// 群组实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{AccountSummary, clean_labels, required_text};
use crate::error::AppResult;

/// 群组实体，members 按加入顺序排列
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub members: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewGroup {
    pub fn validated(self) -> AppResult<Self> {
        Ok(Self {
            name: required_text("name", &self.name)?,
            description: self.description.map(|d| d.trim().to_string()),
            tags: clean_labels(self.tags),
        })
    }
}

/// 成员与创建者均已解析为展示信息的群组
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub members: Vec<AccountSummary>,
    pub created_by: Option<AccountSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_is_required() {
        let group = NewGroup {
            name: " ".into(),
            description: None,
            tags: vec![],
        };
        assert!(group.validated().is_err());
    }

    #[test]
    fn group_tags_are_cleaned() {
        let group = NewGroup {
            name: " Classics ".into(),
            description: Some(" old books ".into()),
            tags: vec!["classic".into(), "".into(), "classic".into()],
        }
        .validated()
        .unwrap();
        assert_eq!(group.name, "Classics");
        assert_eq!(group.description.as_deref(), Some("old books"));
        assert_eq!(group.tags, vec!["classic"]);
    }
}
