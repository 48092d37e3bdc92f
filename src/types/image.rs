use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub id: String,
    pub parent_id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub created: i64,
    pub size: i64,
    pub shared_size: i64,
    pub virtual_size: i64,
    pub labels: HashMap<String, String>,
    /// Number of containers using the image, `-1` when not computed.
    pub containers: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageHistoryEntry {
    pub id: String,
    pub created: i64,
    pub created_by: String,
    pub tags: Vec<String>,
    pub size: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImageListOptions {
    pub all: bool,
    pub filters: super::Filters,
    pub shared_size: bool,
    pub digests: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub from_image: String,
    pub from_src: String,
    pub repo: String,
    pub tag: String,
    pub message: String,
    pub changes: Vec<String>,
    pub platform: String,
    /// Base64 encoded auth config, sent as `X-Registry-Auth`.
    pub registry_auth: String,
}

impl PullOptions {
    pub fn image(from_image: impl Into<String>) -> Self {
        Self {
            from_image: from_image.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRemoved {
    pub untagged: Vec<String>,
    pub deleted: Vec<String>,
}
