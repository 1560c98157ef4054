//! Comments API, nested under a complaint
//!
//! - GET /complaints/{id}/comments
//! - POST /complaints/{id}/comments
//! - DELETE /complaints/{id}/comments/{comment_id} - Removes the whole thread
//! - POST /complaints/{id}/comments/{comment_id}/reactions - Toggle a reaction

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cd_common::UserRole;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::comment::entity::Reaction;
use crate::complaint::api::{load_visible, ComplaintsState};
use crate::complaint::entity::Attachment;
use crate::shared::api_common::non_blank;
use crate::shared::authorization::{can, require, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::shared::tsid::parse_id;
use crate::{Comment, Complaint};

const MAX_EMOJI_CHARS: usize = 16;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub complaint_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub author_role: UserRole,
    pub attachments: Vec<Attachment>,
    pub is_internal: bool,
    pub reactions: Vec<Reaction>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            complaint_id: c.complaint_id,
            parent_id: c.parent_id,
            content: c.content,
            author_id: c.author_id,
            author_name: c.author_name,
            author_role: c.author_role,
            attachments: c.attachments,
            is_internal: c.is_internal,
            reactions: c.reactions,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    #[serde(default)]
    pub content: String,
    /// Reply target; must be a comment on the same complaint
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Staff-only note, hidden from the client
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub emoji: String,
}

fn validate_body(req: &AddCommentRequest) -> Result<String, PlatformError> {
    let content = req.content.trim();
    if content.is_empty() && req.attachments.is_empty() {
        return Err(PlatformError::validation("A comment needs content or attachments"));
    }
    Ok(content.to_string())
}

fn validate_emoji(emoji: &str) -> Result<&str, PlatformError> {
    let emoji = emoji.trim();
    if emoji.is_empty() || emoji.chars().count() > MAX_EMOJI_CHARS {
        return Err(PlatformError::validation("emoji must be a short non-empty string"));
    }
    Ok(emoji)
}

async fn load_comment(
    state: &ComplaintsState,
    complaint: &Complaint,
    comment_id: &str,
) -> Result<Comment, PlatformError> {
    let comment_id = parse_id("Comment", comment_id)?;
    state
        .comment_repo
        .find_by_id(comment_id)
        .await?
        .filter(|c| c.complaint_id == complaint.id)
        .ok_or_else(|| PlatformError::not_found("Comment", comment_id))
}

/// List comments, oldest first
#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "comments",
    operation_id = "getApiComplaintsComments",
    params(("id" = String, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Comments; internal ones only for staff", body = Vec<CommentResponse>),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn list_comments(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;
    let include_internal = can(&auth, Action::ViewInternal, &Resource::Complaint(&complaint));

    let comments = state
        .comment_repo
        .find_by_complaint(&complaint.id, include_internal)
        .await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

/// Add a comment or reply
#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "comments",
    operation_id = "postApiComplaintsComments",
    params(("id" = String, Path, description = "Complaint ID")),
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty comment or unknown parent"),
        (status = 403, description = "Internal comments are staff only"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn add_comment(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;
    require(&auth, Action::Comment, &Resource::Complaint(&complaint))?;
    if req.is_internal {
        require(&auth, Action::CommentInternal, &Resource::Complaint(&complaint))?;
    }
    let content = validate_body(&req)?;

    let parent_id = match non_blank(req.parent_id) {
        Some(parent_id) => {
            let parent = state.comment_repo.find_by_id(&parent_id).await?;
            match parent {
                Some(p)
                    if p.complaint_id == complaint.id
                        && can(&auth, Action::Read, &Resource::Comment { complaint: &complaint, comment: &p }) =>
                {
                    Some(p.id)
                }
                _ => {
                    return Err(PlatformError::validation(format!(
                        "Parent comment {} does not belong to this complaint",
                        parent_id
                    )))
                }
            }
        }
        None => None,
    };

    let mut comment = Comment::new(&complaint.id, content, &auth.user_id, &auth.name, auth.role);
    comment.parent_id = parent_id;
    comment.is_internal = req.is_internal;
    comment.attachments = req.attachments;

    state.comment_repo.insert(&comment).await?;
    info!(
        complaint_id = %complaint.id,
        comment_id = %comment.id,
        internal = comment.is_internal,
        "Comment added"
    );
    state.notifier.comment_added(&complaint, &auth, &comment);

    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// Delete a comment and its replies
#[utoipa::path(
    delete,
    path = "/{id}/comments/{comment_id}",
    tag = "comments",
    operation_id = "deleteApiComplaintsComment",
    params(
        ("id" = String, Path, description = "Complaint ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Comment thread deleted"),
        (status = 403, description = "Only the author, an admin or the department manager"),
        (status = 404, description = "Complaint or comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;
    let comment = load_comment(&state, &complaint, &comment_id).await?;
    let resource = Resource::Comment {
        complaint: &complaint,
        comment: &comment,
    };
    if !can(&auth, Action::Read, &resource) {
        return Err(PlatformError::not_found("Comment", comment_id));
    }
    require(&auth, Action::Delete, &resource)?;

    let removed = state.comment_repo.delete_thread(&comment.id).await?;
    info!(complaint_id = %complaint.id, comment_id = %comment.id, removed, "Comment thread deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the caller's reaction on a comment
#[utoipa::path(
    post,
    path = "/{id}/comments/{comment_id}/reactions",
    tag = "comments",
    operation_id = "postApiComplaintsCommentReactions",
    params(
        ("id" = String, Path, description = "Complaint ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    request_body = ReactionRequest,
    responses(
        (status = 200, description = "Comment with updated reactions", body = CommentResponse),
        (status = 400, description = "Missing emoji"),
        (status = 404, description = "Complaint or comment not found")
    )
)]
pub async fn toggle_reaction(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path((id, comment_id)): Path<(String, String)>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<CommentResponse>, PlatformError> {
    let emoji = validate_emoji(&req.emoji)?;
    let complaint = load_visible(&state, &auth, &id).await?;
    let mut comment = load_comment(&state, &complaint, &comment_id).await?;
    if !can(
        &auth,
        Action::Read,
        &Resource::Comment {
            complaint: &complaint,
            comment: &comment,
        },
    ) {
        return Err(PlatformError::not_found("Comment", comment_id));
    }

    comment.toggle_reaction(&auth.user_id, emoji);
    state.comment_repo.update(&comment).await?;

    Ok(Json(comment.into()))
}

/// Comment routes; merged into the complaints router before its state is attached
pub fn comment_routes() -> OpenApiRouter<ComplaintsState> {
    OpenApiRouter::new()
        .routes(routes!(list_comments, add_comment))
        .routes(routes!(delete_comment))
        .routes(routes!(toggle_reaction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_needs_content_or_attachment() {
        let empty = AddCommentRequest {
            content: "   ".into(),
            ..Default::default()
        };
        assert!(validate_body(&empty).is_err());

        let attachment_only = AddCommentRequest {
            attachments: vec![Attachment {
                url: "/uploads/x.png".into(),
                filename: "x.png".into(),
                content_type: "image/png".into(),
                size: 10,
            }],
            ..Default::default()
        };
        assert_eq!(validate_body(&attachment_only).unwrap(), "");

        let text = AddCommentRequest {
            content: " still broken ".into(),
            ..Default::default()
        };
        assert_eq!(validate_body(&text).unwrap(), "still broken");
    }

    #[test]
    fn test_emoji_validation() {
        assert_eq!(validate_emoji(" 👍 ").unwrap(), "👍");
        assert!(validate_emoji("").is_err());
        assert!(validate_emoji(&"x".repeat(40)).is_err());
    }

    #[test]
    fn test_response_shape() {
        let mut comment = Comment::new("c-1", "hi", "u-1", "Ali", UserRole::Client);
        comment.toggle_reaction("u-2", "🎉");
        let json = serde_json::to_value(CommentResponse::from(comment)).unwrap();
        assert_eq!(json["authorRole"], "client");
        assert_eq!(json["isInternal"], false);
        assert_eq!(json["reactions"][0]["userId"], "u-2");
    }
}
