use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{clean_labels, optional_text, required_text};
use crate::error::{AppError, AppResult};

/// 图书实体，对应数据库中的 books 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub google_id: Option<String>,
    pub cover_url: String,
    pub description: String,
    pub genres: Vec<String>,
    pub published_year: Option<i32>,
    pub average_rating: f64,
    pub total_ratings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 手动添加或导入的图书
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

/// 从外部目录导入的图书
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookImport {
    #[serde(default)]
    pub google_id: Option<String>,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

/// 外部检索结果，不落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub published_year: Option<i32>,
    pub average_rating: f64,
    pub is_external: bool,
}

fn check_rating(rating: Option<f64>) -> AppResult<Option<f64>> {
    match rating {
        Some(r) if !(0.0..=5.0).contains(&r) => Err(AppError::ValidationFailed(
            "averageRating must be between 0 and 5".into(),
        )),
        other => Ok(other),
    }
}

fn check_year(year: Option<i32>) -> AppResult<Option<i32>> {
    match year {
        Some(y) if !(0..=9999).contains(&y) => Err(AppError::ValidationFailed(
            "publishedYear must be between 0 and 9999".into(),
        )),
        other => Ok(other),
    }
}

impl NewBook {
    pub fn validated(self) -> AppResult<Self> {
        Ok(Self {
            title: required_text("title", &self.title)?,
            author: required_text("author", &self.author)?,
            google_id: optional_text(self.google_id),
            cover_url: optional_text(self.cover_url),
            description: self.description.map(|d| d.trim().to_string()),
            genres: clean_labels(self.genres),
            published_year: check_year(self.published_year)?,
            average_rating: check_rating(self.average_rating)?,
        })
    }
}

impl BookImport {
    pub fn validated(self) -> AppResult<Self> {
        let google_id = optional_text(self.google_id)
            .ok_or_else(|| AppError::ValidationFailed("googleId is required".into()))?;
        Ok(Self {
            google_id: Some(google_id),
            title: required_text("title", &self.title)?,
            author: required_text("author", &self.author)?,
            cover_url: optional_text(self.cover_url),
            description: self.description.map(|d| d.trim().to_string()),
            published_year: check_year(self.published_year)?,
            average_rating: check_rating(self.average_rating)?,
        })
    }

    /// 导入评分是否可用于回填
    pub fn backfill_rating(&self) -> Option<f64> {
        self.average_rating.filter(|r| *r > 0.0)
    }
}

impl From<BookImport> for NewBook {
    fn from(import: BookImport) -> Self {
        Self {
            title: import.title,
            author: import.author,
            google_id: import.google_id,
            cover_url: import.cover_url,
            description: import.description,
            genres: Vec::new(),
            published_year: import.published_year,
            average_rating: import.average_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_book_requires_title_and_author() {
        let missing_author = NewBook {
            title: "Dune".into(),
            author: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(
            missing_author.validated(),
            Err(AppError::ValidationFailed(_))
        ));

        let book = NewBook {
            title: " Dune ".into(),
            author: "Frank Herbert".into(),
            genres: vec!["sci-fi".into(), " ".into()],
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.genres, vec!["sci-fi"]);
    }

    #[test]
    fn import_requires_google_id() {
        let import = BookImport {
            google_id: None,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            cover_url: None,
            description: None,
            published_year: None,
            average_rating: Some(4.5),
        };
        assert!(import.validated().is_err());
    }

    #[test]
    fn import_checks_title_author_and_year() {
        let blank = BookImport {
            google_id: Some("g1".into()),
            title: "   ".into(),
            author: "".into(),
            cover_url: None,
            description: None,
            published_year: Some(-5),
            average_rating: None,
        };
        assert!(matches!(
            blank.validated(),
            Err(AppError::ValidationFailed(_))
        ));

        let bad_year = BookImport {
            google_id: Some("g1".into()),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            cover_url: None,
            description: None,
            published_year: Some(10_000),
            average_rating: None,
        };
        assert!(bad_year.validated().is_err());

        let trimmed = BookImport {
            google_id: Some(" g1 ".into()),
            title: " Dune ".into(),
            author: " Frank Herbert ".into(),
            cover_url: Some("  ".into()),
            description: None,
            published_year: Some(1965),
            average_rating: None,
        }
        .validated()
        .unwrap();
        assert_eq!(trimmed.google_id.as_deref(), Some("g1"));
        assert_eq!(trimmed.title, "Dune");
        assert_eq!(trimmed.author, "Frank Herbert");
        assert_eq!(trimmed.cover_url, None);
    }

    #[test]
    fn zero_rating_is_not_a_backfill_candidate() {
        let mut import = BookImport {
            google_id: Some("g1".into()),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            cover_url: None,
            description: None,
            published_year: None,
            average_rating: Some(0.0),
        };
        assert_eq!(import.backfill_rating(), None);
        import.average_rating = Some(4.2);
        assert_eq!(import.backfill_rating(), Some(4.2));
    }
}
