//! Complaint event publishing
//!
//! Thin layer over the notification queue. Enqueue failures are already
//! logged by the queue and never reach the caller.

use cd_common::{ComplaintStatus, NotificationEvent};
use cd_notify::{EventDetails, NotificationJob, NotificationQueue};

use crate::shared::authorization::AuthContext;
use crate::{Comment, Complaint};

#[derive(Debug, Clone)]
pub struct ComplaintNotifier {
    queue: NotificationQueue,
}

impl ComplaintNotifier {
    pub fn new(queue: NotificationQueue) -> Self {
        Self { queue }
    }

    pub fn disabled() -> Self {
        Self::new(NotificationQueue::disabled())
    }

    fn publish(&self, event: NotificationEvent, complaint: &Complaint, ctx: &AuthContext, details: EventDetails) {
        let job = NotificationJob::new(event, ctx.actor(), complaint.snapshot()).with_details(details);
        let _ = self.queue.enqueue(job);
    }

    pub fn created(&self, complaint: &Complaint, ctx: &AuthContext, assignee_name: Option<String>) {
        self.publish(
            NotificationEvent::Created,
            complaint,
            ctx,
            EventDetails {
                new_status: Some(complaint.status),
                new_assignee: assignee_name,
                ..Default::default()
            },
        );
    }

    /// `assigned` while the complaint was still `New`, `reassigned` afterwards
    pub fn assigned(
        &self,
        complaint: &Complaint,
        ctx: &AuthContext,
        was_new: bool,
        previous_assignee: Option<String>,
        new_assignee: Option<String>,
        notes: Option<String>,
    ) {
        let event = if was_new {
            NotificationEvent::Assigned
        } else {
            NotificationEvent::Reassigned
        };
        self.publish(
            event,
            complaint,
            ctx,
            EventDetails {
                previous_assignee,
                new_assignee,
                notes,
                ..Default::default()
            },
        );
    }

    pub fn status_changed(
        &self,
        complaint: &Complaint,
        ctx: &AuthContext,
        old_status: ComplaintStatus,
        notes: Option<String>,
    ) {
        self.publish(
            NotificationEvent::StatusChanged,
            complaint,
            ctx,
            EventDetails {
                old_status: Some(old_status),
                new_status: Some(complaint.status),
                notes,
                ..Default::default()
            },
        );
    }

    pub fn comment_added(&self, complaint: &Complaint, ctx: &AuthContext, comment: &Comment) {
        let text = comment.content.trim();
        self.publish(
            NotificationEvent::CommentAdded,
            complaint,
            ctx,
            EventDetails {
                comment: (!text.is_empty()).then(|| text.to_string()),
                internal: comment.is_internal,
                ..Default::default()
            },
        );
    }
}
