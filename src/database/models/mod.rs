// 数据库实体定义
// 以及写入前的校验

pub mod account;
pub mod book;
pub mod group;
pub mod shelf;
pub mod topic;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub use account::{
    Account, AccountSummary, NewAccount, NewAccountRecord, ProfileChanges, PublicProfile,
    UserProfile,
};
pub use book::{Book, BookImport, ExternalBook, NewBook};
pub use group::{Group, GroupView, NewGroup};
pub use shelf::{NewShelfEntry, ShelfEntry, ShelfItem, ShelfStats, ShelfStatus, ShelfUpdate};
pub use topic::{GroupRef, NewPost, NewTopic, Post, PostView, Topic, TopicView};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 分页与搜索参数
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// 校验后的分页参数
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn validated(self) -> AppResult<PageRequest> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(AppError::ValidationFailed("page must be at least 1".into()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::ValidationFailed(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(PageRequest {
            page,
            limit,
            search: optional_text(self.search),
        })
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit as i64 - 1) / self.limit as i64
    }
}

/// 必填文本字段：去除首尾空白后不能为空
pub(crate) fn required_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationFailed(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn bounded_text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(AppError::ValidationFailed(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 标签类字段：去空白，丢弃空项，保持原有顺序去重
pub(crate) fn clean_labels(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !cleaned.contains(&value) {
            cleaned.push(value);
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults() {
        let page = PageQuery {
            page: None,
            limit: None,
            search: Some("   ".into()),
        }
        .validated()
        .unwrap();
        assert_eq!(
            page,
            PageRequest {
                page: 1,
                limit: DEFAULT_PAGE_SIZE,
                search: None
            }
        );
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn page_bounds_are_enforced() {
        let zero_page = PageQuery {
            page: Some(0),
            limit: None,
            search: None,
        };
        assert!(matches!(
            zero_page.validated(),
            Err(AppError::ValidationFailed(_))
        ));

        let huge_limit = PageQuery {
            page: None,
            limit: Some(MAX_PAGE_SIZE + 1),
            search: None,
        };
        assert!(huge_limit.validated().is_err());
    }

    #[test]
    fn page_count_rounds_up() {
        let page = PageRequest {
            page: 3,
            limit: 20,
            search: None,
        };
        assert_eq!(page.offset(), 40);
        assert_eq!(page.pages(0), 0);
        assert_eq!(page.pages(20), 1);
        assert_eq!(page.pages(41), 3);
    }

    #[test]
    fn labels_are_cleaned() {
        let labels = clean_labels(vec![
            " fantasy ".into(),
            "".into(),
            "sci-fi".into(),
            "fantasy".into(),
        ]);
        assert_eq!(labels, vec!["fantasy", "sci-fi"]);
    }
}
