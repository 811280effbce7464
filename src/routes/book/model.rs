use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ExternalSearchQuery {
    #[serde(default)]
    pub q: String,
}
