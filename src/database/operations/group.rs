// 群组操作
// 创建、检索、加入与退出

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::AccountDirectory;
use crate::database::Store;
use crate::database::models::{Group, GroupView, NewGroup, PageQuery};
use crate::error::{AppError, AppResult};

const GROUP_NOT_FOUND: &str = "Group not found";

#[derive(Debug, Serialize)]
pub struct GroupPage {
    pub groups: Vec<GroupView>,
    pub total: i64,
    pub page: u32,
    pub pages: i64,
}

/// 群组操作，成员集合以用户ID去重
pub struct GroupOperation {
    store: Arc<dyn Store>,
}

impl GroupOperation {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 创建群组，创建者自动成为第一个成员
    pub async fn create(&self, creator: Uuid, group: NewGroup) -> AppResult<GroupView> {
        let group = group.validated()?;
        let group = self.store.insert_group(group, creator).await?;
        info!("用户 {} 创建了群组 {} ({})", creator, group.name, group.id);
        self.view(group).await
    }

    /// 按名称、描述或标签搜索，最新创建的在前
    pub async fn list(&self, query: PageQuery) -> AppResult<GroupPage> {
        let page = query.validated()?;
        let (groups, total) = self.store.list_groups(&page).await?;

        let directory = AccountDirectory::load(
            self.store.as_ref(),
            groups
                .iter()
                .flat_map(|g| g.members.iter().copied().chain([g.created_by])),
        )
        .await?;

        Ok(GroupPage {
            groups: groups
                .into_iter()
                .map(|g| Self::resolve(g, &directory))
                .collect(),
            total,
            page: page.page,
            pages: page.pages(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<GroupView> {
        let group = self.find(id).await?;
        self.view(group).await
    }

    /// 加入群组，已是成员时不做任何改变
    pub async fn join(&self, group_id: Uuid, user: Uuid) -> AppResult<()> {
        self.find(group_id).await?;
        if self.store.add_group_member(group_id, user).await? {
            info!("用户 {} 加入群组 {}", user, group_id);
        }
        Ok(())
    }

    pub async fn leave(&self, group_id: Uuid, user: Uuid) -> AppResult<()> {
        self.find(group_id).await?;
        if self.store.remove_group_member(group_id, user).await? {
            info!("用户 {} 退出群组 {}", user, group_id);
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Group> {
        self.store
            .find_group(id)
            .await?
            .ok_or_else(|| AppError::NotFound(GROUP_NOT_FOUND.into()))
    }

    async fn view(&self, group: Group) -> AppResult<GroupView> {
        let directory = AccountDirectory::load(
            self.store.as_ref(),
            group.members.iter().copied().chain([group.created_by]),
        )
        .await?;
        Ok(Self::resolve(group, &directory))
    }

    fn resolve(group: Group, directory: &AccountDirectory) -> GroupView {
        GroupView {
            members: directory.resolve_all(&group.members),
            created_by: directory.get(&group.created_by),
            id: group.id,
            name: group.name,
            description: group.description,
            tags: group.tags,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}
