//! Message templates for WhatsApp notifications.

use cd_common::NotificationEvent;

use crate::{Actor, ComplaintSnapshot, EventDetails};

const SHORT_ID_LEN: usize = 6;
const COMMENT_EXCERPT_LEN: usize = 120;

/// Renders the text of a notification.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    app_base_url: String,
}

impl MessageFormatter {
    pub fn new(app_base_url: impl Into<String>) -> Self {
        Self {
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Deep link to the complaint's detail page
    pub fn complaint_link(&self, complaint_id: &str) -> String {
        format!("{}/admin/complaints/{}", self.app_base_url, complaint_id)
    }

    pub fn format(
        &self,
        complaint: &ComplaintSnapshot,
        actor: &Actor,
        event: &NotificationEvent,
        details: &EventDetails,
    ) -> String {
        let short = short_id(&complaint.id);
        let link = self.complaint_link(&complaint.id);

        let body = match event {
            NotificationEvent::Created => format!(
                "🆕 *New Complaint* #{short}\n\n*Title:* {title}\n*Status:* {status}\n*Submitted by:* {actor}",
                title = complaint.title,
                status = complaint.status,
                actor = actor.name,
            ),
            NotificationEvent::Assigned => format!(
                "📌 *Complaint Assigned* #{short}\n\n*Title:* {title}\n*Assigned to:* {assignee}\n*Assigned by:* {actor}",
                title = complaint.title,
                assignee = or_dash(details.new_assignee.as_deref()),
                actor = actor.name,
            ),
            NotificationEvent::Reassigned => format!(
                "🔄 *Complaint Reassigned* #{short}\n\n*Title:* {title}\n*From:* {from}\n*To:* {to}\n*By:* {actor}",
                title = complaint.title,
                from = or_dash(details.previous_assignee.as_deref()),
                to = or_dash(details.new_assignee.as_deref()),
                actor = actor.name,
            ),
            NotificationEvent::StatusChanged => {
                let old = details.old_status.map(|s| s.to_string());
                let new = details.new_status.unwrap_or(complaint.status);
                format!(
                    "📊 *Status Updated* #{short}\n\n*Title:* {title}\n*Status:* {old} → {new}\n*Updated by:* {actor}",
                    title = complaint.title,
                    old = or_dash(old.as_deref()),
                    actor = actor.name,
                )
            }
            NotificationEvent::CommentAdded => format!(
                "💬 *New Comment* #{short}\n\n*Title:* {title}\n*{actor}:* {excerpt}",
                title = complaint.title,
                actor = actor.name,
                excerpt = excerpt(details.comment.as_deref().unwrap_or("(attachment)")),
            ),
            NotificationEvent::Other(name) => format!(
                "🔔 *Complaint Update* #{short}\n\n*Title:* {title}\n*Event:* {name}\n*Status:* {status}\n*By:* {actor}",
                title = complaint.title,
                status = complaint.status,
                actor = actor.name,
            ),
        };

        let notes = details
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("\n*Notes:* {}", n))
            .unwrap_or_default();

        format!("{body}{notes}\n\n🔗 {link}")
    }
}

/// Last six characters of an id, upper-cased
pub fn short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let start = chars.len().saturating_sub(SHORT_ID_LEN);
    chars[start..].iter().collect::<String>().to_uppercase()
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= COMMENT_EXCERPT_LEN {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(COMMENT_EXCERPT_LEN).collect();
    cut.push('…');
    cut
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cd_common::{ComplaintStatus, UserRole};

    fn complaint() -> ComplaintSnapshot {
        ComplaintSnapshot {
            id: "0HZXEQ5Y8JY5Z".to_string(),
            title: "Login page broken".to_string(),
            status: ComplaintStatus::InProgress,
            client_id: "c".to_string(),
            assignee_id: None,
            department_id: None,
        }
    }

    fn actor() -> Actor {
        Actor {
            user_id: "u".to_string(),
            name: "Sara Khan".to_string(),
            role: UserRole::Manager,
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0HZXEQ5Y8JY5Z"), "Y8JY5Z");
        assert_eq!(short_id("0hzxeq5y8jy5z"), "Y8JY5Z");
        assert_eq!(short_id("abc"), "ABC");
    }

    #[test]
    fn test_status_changed_template() {
        let formatter = MessageFormatter::new("https://desk.example.com/");
        let details = EventDetails {
            old_status: Some(ComplaintStatus::Assigned),
            new_status: Some(ComplaintStatus::InProgress),
            notes: Some("Looking into it".to_string()),
            ..Default::default()
        };

        let text = formatter.format(&complaint(), &actor(), &NotificationEvent::StatusChanged, &details);

        assert!(text.starts_with("📊"));
        assert!(text.contains("#Y8JY5Z"));
        assert!(text.contains("Assigned → In Progress"));
        assert!(text.contains("Sara Khan"));
        assert!(text.contains("*Notes:* Looking into it"));
        assert!(text.ends_with("https://desk.example.com/admin/complaints/0HZXEQ5Y8JY5Z"));
    }

    #[test]
    fn test_reassigned_template_shows_both_assignees() {
        let formatter = MessageFormatter::new("http://localhost:3000");
        let details = EventDetails {
            previous_assignee: Some("Ali".to_string()),
            new_assignee: Some("Bilal".to_string()),
            ..Default::default()
        };

        let text = formatter.format(&complaint(), &actor(), &NotificationEvent::Reassigned, &details);
        assert!(text.contains("*From:* Ali"));
        assert!(text.contains("*To:* Bilal"));
    }

    #[test]
    fn test_comment_excerpt_is_truncated() {
        let formatter = MessageFormatter::new("http://localhost:3000");
        let details = EventDetails {
            comment: Some("x".repeat(300)),
            ..Default::default()
        };

        let text = formatter.format(&complaint(), &actor(), &NotificationEvent::CommentAdded, &details);
        assert!(text.contains(&format!("{}…", "x".repeat(120))));
        assert!(!text.contains(&"x".repeat(121)));
    }

    #[test]
    fn test_unknown_event_uses_fallback_template() {
        let formatter = MessageFormatter::new("http://localhost:3000");
        let text = formatter.format(
            &complaint(),
            &actor(),
            &NotificationEvent::Other("escalated".to_string()),
            &EventDetails::default(),
        );
        assert!(text.starts_with("🔔"));
        assert!(text.contains("*Event:* escalated"));
        assert!(!text.contains("*Notes:*"));
    }
}
