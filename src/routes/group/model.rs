use serde::Deserialize;

use crate::database::models::NewGroup;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreateGroupRequest> for NewGroup {
    fn from(req: CreateGroupRequest) -> Self {
        NewGroup {
            name: req.name,
            description: req.description,
            tags: req.tags,
        }
    }
}
