//! Notification queue and dispatch loop
//!
//! Request handlers push jobs onto a bounded channel and return at once.
//! A single worker task drains the channel, resolves stakeholders, applies
//! the recipient policy, renders the message and dispatches it. When the
//! channel is full the job is dropped with a warning; the mutation that
//! produced it has already been committed.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cd_common::NotificationEvent;

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::formatter::MessageFormatter;
use crate::policy::select_recipients;
use crate::stakeholder::{resolve_stakeholders, StakeholderDirectory};
use crate::{Actor, ComplaintSnapshot, EventDetails};

/// A complaint event waiting to be fanned out
#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub event: NotificationEvent,
    pub actor: Actor,
    pub complaint: ComplaintSnapshot,
    pub details: EventDetails,
}

impl NotificationJob {
    pub fn new(event: NotificationEvent, actor: Actor, complaint: ComplaintSnapshot) -> Self {
        Self {
            event,
            actor,
            complaint,
            details: EventDetails::default(),
        }
    }

    pub fn with_details(mut self, details: EventDetails) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Notification queue full, job dropped")]
    Full,

    #[error("Notification worker stopped")]
    Closed,
}

/// Sending half of the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: Option<mpsc::Sender<NotificationJob>>,
}

impl NotificationQueue {
    /// Create a queue holding at most `capacity` pending jobs
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender: Some(sender) }, receiver)
    }

    /// A queue that accepts and discards every job
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Hand a job to the worker without waiting.
    pub fn enqueue(&self, job: NotificationJob) -> Result<(), QueueError> {
        let Some(sender) = &self.sender else {
            debug!(event = %job.event, "Notifications disabled, job discarded");
            return Ok(());
        };

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    event = %job.event,
                    complaint_id = %job.complaint.id,
                    "Notification queue full, job dropped"
                );
                Err(QueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(
                    event = %job.event,
                    complaint_id = %job.complaint.id,
                    "Notification worker stopped, job dropped"
                );
                Err(QueueError::Closed)
            }
        }
    }
}

/// Totals reported by the worker when its queue closes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStats {
    pub jobs: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Consumes notification jobs one at a time
pub struct NotificationWorker {
    directory: Arc<dyn StakeholderDirectory>,
    formatter: MessageFormatter,
    dispatcher: Dispatcher,
}

impl NotificationWorker {
    pub fn new(
        directory: Arc<dyn StakeholderDirectory>,
        formatter: MessageFormatter,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            directory,
            formatter,
            dispatcher,
        }
    }

    /// Run one job through the pipeline
    pub async fn process(&self, job: &NotificationJob) -> DispatchReport {
        let mut phones = resolve_stakeholders(self.directory.as_ref(), &job.complaint).await;
        if job.details.internal {
            phones.client = None;
        }
        let recipients = select_recipients(&job.event, Some(job.actor.role), &phones);

        if recipients.is_empty() {
            debug!(
                event = %job.event,
                complaint_id = %job.complaint.id,
                "No recipients for notification"
            );
            return DispatchReport::default();
        }

        let message = self
            .formatter
            .format(&job.complaint, &job.actor, &job.event, &job.details);

        self.dispatcher.dispatch(&message, &recipients).await
    }

    /// Drain the queue until every sender is dropped
    pub async fn run(self, mut receiver: mpsc::Receiver<NotificationJob>) -> WorkerStats {
        info!("Notification worker started");
        let mut stats = WorkerStats::default();

        while let Some(job) = receiver.recv().await {
            let report = self.process(&job).await;
            stats.jobs += 1;
            stats.sent += report.sent;
            stats.failed += report.failed;
        }

        info!(
            jobs = stats.jobs,
            sent = stats.sent,
            failed = stats.failed,
            "Notification worker stopped"
        );
        stats
    }
}

/// Start the dispatch loop on its own task.
///
/// The returned handle resolves once every clone of the queue is dropped
/// and the remaining jobs are drained.
pub fn spawn_notification_worker(
    worker: NotificationWorker,
    capacity: usize,
) -> (NotificationQueue, JoinHandle<WorkerStats>) {
    let (queue, receiver) = NotificationQueue::bounded(capacity);
    let handle = tokio::spawn(worker.run(receiver));
    (queue, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cd_common::{ComplaintStatus, UserRole};

    fn job(event: NotificationEvent) -> NotificationJob {
        NotificationJob::new(
            event,
            Actor {
                user_id: "u1".to_string(),
                name: "Ali".to_string(),
                role: UserRole::Client,
            },
            ComplaintSnapshot {
                id: "0HZXEQ5Y8JY5Z".to_string(),
                title: "Leaking tap".to_string(),
                status: ComplaintStatus::New,
                client_id: "u1".to_string(),
                assignee_id: None,
                department_id: None,
            },
        )
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let (queue, mut receiver) = NotificationQueue::bounded(1);

        assert_eq!(queue.enqueue(job(NotificationEvent::Created)), Ok(()));
        assert_eq!(queue.enqueue(job(NotificationEvent::Assigned)), Err(QueueError::Full));

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event, NotificationEvent::Created);
    }

    #[tokio::test]
    async fn test_closed_queue_reports_closed() {
        let (queue, receiver) = NotificationQueue::bounded(4);
        drop(receiver);

        assert_eq!(queue.enqueue(job(NotificationEvent::Created)), Err(QueueError::Closed));
    }

    #[test]
    fn test_disabled_queue_discards_silently() {
        let queue = NotificationQueue::disabled();
        assert!(!queue.is_enabled());
        tokio_test::assert_ok!(queue.enqueue(job(NotificationEvent::Created)));
    }
}
