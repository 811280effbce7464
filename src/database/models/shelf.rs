use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Book;
use crate::error::{AppError, AppResult};

/// 阅读状态，任意状态之间可以自由切换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShelfStatus {
    Read,
    CurrentlyReading,
    WantToRead,
}

impl ShelfStatus {
    pub const ALL: [ShelfStatus; 3] = [
        ShelfStatus::WantToRead,
        ShelfStatus::CurrentlyReading,
        ShelfStatus::Read,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfStatus::Read => "read",
            ShelfStatus::CurrentlyReading => "currently-reading",
            ShelfStatus::WantToRead => "want-to-read",
        }
    }
}

impl fmt::Display for ShelfStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShelfStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(ShelfStatus::Read),
            "currently-reading" => Ok(ShelfStatus::CurrentlyReading),
            "want-to-read" => Ok(ShelfStatus::WantToRead),
            other => Err(AppError::ValidationFailed(format!(
                "status must be one of read, currently-reading, want-to-read (got {})",
                other
            ))),
        }
    }
}

/// 书架条目，每个用户每本书只有一条
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub status: ShelfStatus,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub date_added: DateTime<Utc>,
    pub date_read: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShelfEntry {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub status: ShelfStatus,
    pub rating: Option<i32>,
    pub review: Option<String>,
    /// 状态为 read 时记录的完成时间
    pub date_read: Option<DateTime<Utc>>,
}

/// 部分更新，None 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct ShelfUpdate {
    pub status: Option<ShelfStatus>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    /// 仅在 date_read 为空时写入
    pub mark_read_at: Option<DateTime<Utc>>,
}

/// 解析了图书的书架条目；图书被删除时 book 为 None
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book: Option<Book>,
    pub status: ShelfStatus,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub date_added: DateTime<Utc>,
    pub date_read: Option<DateTime<Utc>>,
}

impl ShelfItem {
    pub fn new(entry: ShelfEntry, book: Option<Book>) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            book,
            status: entry.status,
            rating: entry.rating,
            review: entry.review,
            date_added: entry.date_added,
            date_read: entry.date_read,
        }
    }
}

/// 按状态分组的计数，固定包含三个键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfStats {
    #[serde(rename = "want-to-read")]
    pub want_to_read: i64,
    #[serde(rename = "currently-reading")]
    pub currently_reading: i64,
    pub read: i64,
}

impl ShelfStats {
    pub fn from_counts(counts: impl IntoIterator<Item = (ShelfStatus, i64)>) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            match status {
                ShelfStatus::WantToRead => stats.want_to_read += count,
                ShelfStatus::CurrentlyReading => stats.currently_reading += count,
                ShelfStatus::Read => stats.read += count,
            }
        }
        stats
    }

    pub fn total(&self) -> i64 {
        self.want_to_read + self.currently_reading + self.read
    }
}

pub fn validate_rating(rating: Option<i32>) -> AppResult<Option<i32>> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(AppError::ValidationFailed(
            "rating must be between 1 and 5".into(),
        )),
        other => Ok(other),
    }
}

pub fn normalize_review(review: Option<String>) -> Option<String> {
    review.map(|r| r.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_kebab_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ShelfStatus::CurrentlyReading).unwrap(),
            "\"currently-reading\""
        );
        let parsed: ShelfStatus = serde_json::from_str("\"want-to-read\"").unwrap();
        assert_eq!(parsed, ShelfStatus::WantToRead);
        for status in ShelfStatus::ALL {
            assert_eq!(status.as_str().parse::<ShelfStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        assert!(matches!(
            "finished".parse::<ShelfStatus>(),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn stats_always_have_three_keys() {
        let stats = ShelfStats::from_counts(vec![(ShelfStatus::Read, 2)]);
        let json = serde_json::to_value(stats).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(json["read"], 2);
        assert_eq!(json["want-to-read"], 0);
        assert_eq!(json["currently-reading"], 0);
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn rating_range() {
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
        assert_eq!(validate_rating(Some(5)).unwrap(), Some(5));
        assert_eq!(validate_rating(None).unwrap(), None);
    }
}
