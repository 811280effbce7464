use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{ShelfStatus, ShelfUpdate};
use crate::error::{AppError, AppResult};

/// 状态以文本接收，非法值统一报告为校验错误
fn parse_status(raw: Option<&str>) -> AppResult<Option<ShelfStatus>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToShelfRequest {
    pub book_id: String,
    pub status: String,
    pub rating: Option<i32>,
    pub review: Option<String>,
}

impl AddToShelfRequest {
    pub fn book_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(self.book_id.trim())
            .map_err(|_| AppError::ValidationFailed("bookId is invalid".into()))
    }

    pub fn status(&self) -> AppResult<ShelfStatus> {
        parse_status(Some(&self.status))?
            .ok_or_else(|| AppError::ValidationFailed("status is required".into()))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateShelfRequest {
    pub status: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
}

impl UpdateShelfRequest {
    pub fn into_update(self) -> AppResult<ShelfUpdate> {
        Ok(ShelfUpdate {
            status: parse_status(self.status.as_deref())?,
            rating: self.rating,
            review: self.review,
            mark_read_at: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    pub fn status(&self) -> AppResult<Option<ShelfStatus>> {
        parse_status(self.status.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_is_checked() {
        let query = StatusQuery {
            status: Some("currently-reading".into()),
        };
        assert_eq!(query.status().unwrap(), Some(ShelfStatus::CurrentlyReading));

        let blank = StatusQuery {
            status: Some("".into()),
        };
        assert_eq!(blank.status().unwrap(), None);

        let bad = UpdateShelfRequest {
            status: Some("finished".into()),
            rating: None,
            review: None,
        };
        assert!(matches!(
            bad.into_update(),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn add_request_needs_a_valid_book_id() {
        let req: AddToShelfRequest = serde_json::from_value(serde_json::json!({
            "bookId": "nope",
            "status": "read"
        }))
        .unwrap();
        assert!(req.book_id().is_err());
        assert_eq!(req.status().unwrap(), ShelfStatus::Read);
    }
}
