// 业务操作层
// 校验输入、组合存储调用、解析展示字段

pub mod book;
pub mod group;
pub mod shelf;
pub mod social;
pub mod topic;
pub mod user;

use std::collections::HashMap;

use uuid::Uuid;

use super::Store;
use super::models::AccountSummary;
use crate::error::AppResult;

pub use book::{BookOperation, BookPage, GoogleBooksClient};
pub use group::{GroupOperation, GroupPage};
pub use shelf::ShelfOperation;
pub use social::SocialOperation;
pub use topic::TopicOperation;
pub use user::UserOperation;

/// 一次批量查询得到的账户展示信息
pub(crate) struct AccountDirectory {
    entries: HashMap<Uuid, AccountSummary>,
}

impl AccountDirectory {
    pub(crate) async fn load(
        store: &dyn Store,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> AppResult<Self> {
        let mut wanted: Vec<Uuid> = ids.into_iter().collect();
        wanted.sort();
        wanted.dedup();
        let entries = if wanted.is_empty() {
            HashMap::new()
        } else {
            store
                .account_summaries(&wanted)
                .await?
                .into_iter()
                .map(|summary| (summary.id, summary))
                .collect()
        };
        Ok(Self { entries })
    }

    pub(crate) fn get(&self, id: &Uuid) -> Option<AccountSummary> {
        self.entries.get(id).cloned()
    }

    /// 按输入顺序解析，悬空的ID被丢弃
    pub(crate) fn resolve_all(&self, ids: &[Uuid]) -> Vec<AccountSummary> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }
}
