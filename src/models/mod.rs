use crate::content::ContentNode;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Untitled";

/// Public profile of a user as embedded in document payloads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Permission {
    pub id: String,
    pub role: String,
    pub user: UserSummary,
}

/// Minimal view of a document: enough to show it in a tree or link to it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,

    /// Body; absent in listings that skip content.
    #[serde(default)]
    pub content: Option<ContentNode>,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub position: i64,

    #[serde(default)]
    pub owner_id: Option<String>,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub owner: Option<UserSummary>,

    #[serde(default)]
    pub children: Vec<DocumentRef>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Document {
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            id: self.id.clone(),
            title: self.title.clone(),
            icon: self.icon.clone(),
        }
    }

    /// Title for display; blank titles read as the default.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            &self.title
        }
    }

    pub fn body(&self) -> ContentNode {
        self.content.clone().unwrap_or_else(ContentNode::empty_doc)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentNode>,
}

impl NewDocument {
    pub fn untitled(parent_id: Option<String>) -> Self {
        Self {
            title: Some(DEFAULT_TITLE.to_string()),
            parent_id,
            ..Default::default()
        }
    }
}

/// Partial update; absent fields are left as stored.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentNode>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MediaImage {
    pub name: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
}

/// Trimmed display name, or a validation error when nothing is left.
pub fn validate_display_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    Ok(name.to_string())
}
