//! Comment Entity
//!
//! Discussion on a complaint. Replies point at their parent through
//! `parentId`; internal comments are hidden from clients.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use cd_common::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::complaint::entity::Attachment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,

    pub complaint_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub content: String,

    pub author_id: String,
    pub author_name: String,
    pub author_role: UserRole,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub is_internal: bool,

    #[serde(default)]
    pub reactions: Vec<Reaction>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        complaint_id: impl Into<String>,
        content: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        author_role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::TsidGenerator::generate(),
            complaint_id: complaint_id.into(),
            parent_id: None,
            content: content.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            author_role,
            attachments: Vec::new(),
            is_internal: false,
            reactions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add the user's reaction, or remove it when already present.
    ///
    /// Returns true when the reaction was added.
    pub fn toggle_reaction(&mut self, user_id: &str, emoji: &str) -> bool {
        let before = self.reactions.len();
        self.reactions
            .retain(|r| !(r.user_id == user_id && r.emoji == emoji));
        let added = self.reactions.len() == before;
        if added {
            self.reactions.push(Reaction {
                user_id: user_id.to_string(),
                emoji: emoji.to_string(),
            });
        }
        self.updated_at = Utc::now();
        added
    }
}
