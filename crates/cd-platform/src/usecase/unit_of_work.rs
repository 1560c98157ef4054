//! Unit of Work
//!
//! Atomic commit of an aggregate together with the history rows that
//! describe the change, within a single MongoDB transaction.

use async_trait::async_trait;
use mongodb::{
    bson::{doc, to_document, Document},
    Client, ClientSession, Database,
};
use serde::Serialize;
use tracing::{debug, error};

use super::error::UseCaseError;
use super::result::UseCaseResult;
use crate::ComplaintHistory;

const HISTORY_COLLECTION: &str = "complaintHistory";
const COMMENTS_COLLECTION: &str = "comments";
const COMPLAINTS_COLLECTION: &str = "complaints";

/// Unit of Work for writes that must land together.
///
/// `UseCaseResult::success()` is crate-private; a use case that mutates
/// state returns success only through one of these commits.
///
/// ```ignore
/// let row = ComplaintHistory::status_change(&complaint, &ctx.user_id, notes);
/// self.unit_of_work
///     .commit(&complaint, std::slice::from_ref(&row))
///     .await
///     .map(|_| complaint)
/// ```
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Upsert the aggregate and append the history rows.
    ///
    /// Either all writes land or none do.
    async fn commit(
        &self,
        aggregate: &dyn SerializableAggregate,
        history: &[ComplaintHistory],
    ) -> UseCaseResult<()>;

    /// Delete a single aggregate.
    async fn commit_delete(&self, aggregate: &dyn SerializableAggregate) -> UseCaseResult<()>;

    /// Delete a complaint with its history rows and comments.
    async fn commit_complaint_delete(&self, complaint_id: &str) -> UseCaseResult<()>;
}

/// Trait for entities that have an ID field.
pub trait HasId {
    fn id(&self) -> &str;
    fn collection_name() -> &'static str;
}

/// Object-safe view of a persistable aggregate.
pub trait SerializableAggregate: Send + Sync {
    fn id(&self) -> &str;
    fn collection_name(&self) -> &str;
    fn to_document(&self) -> Result<Document, mongodb::bson::ser::Error>;
}

impl<T> SerializableAggregate for T
where
    T: HasId + Serialize + Send + Sync,
{
    fn id(&self) -> &str {
        HasId::id(self)
    }

    fn collection_name(&self) -> &str {
        T::collection_name()
    }

    fn to_document(&self) -> Result<Document, mongodb::bson::ser::Error> {
        to_document(self)
    }
}

/// MongoDB implementation of UnitOfWork using multi-document transactions.
///
/// Transactions need a replica set deployment.
#[derive(Clone)]
pub struct MongoUnitOfWork {
    client: Client,
    database: Database,
}

impl MongoUnitOfWork {
    pub fn new(client: Client, database: Database) -> Self {
        Self { client, database }
    }

    async fn begin(&self) -> Result<ClientSession, UseCaseError> {
        let mut session = self.client.start_session().await.map_err(|e| {
            error!("Failed to start MongoDB session: {}", e);
            UseCaseError::commit(format!("Failed to start session: {}", e))
        })?;

        session.start_transaction().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            UseCaseError::commit(format!("Failed to start transaction: {}", e))
        })?;

        Ok(session)
    }

    async fn finish(&self, mut session: ClientSession) -> UseCaseResult<()> {
        if let Err(e) = session.commit_transaction().await {
            error!("Failed to commit transaction: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        UseCaseResult::success(())
    }

    async fn abort(session: &mut ClientSession, step: &str, e: impl std::fmt::Display) -> UseCaseError {
        let message = format!("Failed to {}: {}", step, e);
        let _ = session.abort_transaction().await;
        error!("{}", message);
        UseCaseError::commit(message)
    }
}

#[async_trait]
impl UnitOfWork for MongoUnitOfWork {
    async fn commit(
        &self,
        aggregate: &dyn SerializableAggregate,
        history: &[ComplaintHistory],
    ) -> UseCaseResult<()> {
        let mut session = match self.begin().await {
            Ok(s) => s,
            Err(e) => return UseCaseResult::failure(e),
        };

        // 1. Persist aggregate
        let aggregate_doc = match aggregate.to_document() {
            Ok(d) => d,
            Err(e) => {
                return UseCaseResult::failure(
                    Self::abort(&mut session, "serialize aggregate", e).await,
                )
            }
        };

        let collection = self
            .database
            .collection::<Document>(aggregate.collection_name());
        if let Err(e) = collection
            .update_one(doc! { "_id": aggregate.id() }, doc! { "$set": &aggregate_doc })
            .upsert(true)
            .session(&mut session)
            .await
        {
            return UseCaseResult::failure(Self::abort(&mut session, "persist aggregate", e).await);
        }

        // 2. Append history
        if !history.is_empty() {
            let history_collection = self
                .database
                .collection::<ComplaintHistory>(HISTORY_COLLECTION);
            if let Err(e) = history_collection
                .insert_many(history)
                .session(&mut session)
                .await
            {
                return UseCaseResult::failure(
                    Self::abort(&mut session, "insert history", e).await,
                );
            }
        }

        let result = self.finish(session).await;
        if result.is_success() {
            debug!(
                collection = aggregate.collection_name(),
                id = aggregate.id(),
                history_rows = history.len(),
                "Committed transaction"
            );
        }
        result
    }

    async fn commit_delete(&self, aggregate: &dyn SerializableAggregate) -> UseCaseResult<()> {
        let mut session = match self.begin().await {
            Ok(s) => s,
            Err(e) => return UseCaseResult::failure(e),
        };

        let collection = self
            .database
            .collection::<Document>(aggregate.collection_name());
        if let Err(e) = collection
            .delete_one(doc! { "_id": aggregate.id() })
            .session(&mut session)
            .await
        {
            return UseCaseResult::failure(Self::abort(&mut session, "delete aggregate", e).await);
        }

        let result = self.finish(session).await;
        if result.is_success() {
            debug!(
                collection = aggregate.collection_name(),
                id = aggregate.id(),
                "Committed delete transaction"
            );
        }
        result
    }

    async fn commit_complaint_delete(&self, complaint_id: &str) -> UseCaseResult<()> {
        let mut session = match self.begin().await {
            Ok(s) => s,
            Err(e) => return UseCaseResult::failure(e),
        };

        let complaints = self.database.collection::<Document>(COMPLAINTS_COLLECTION);
        if let Err(e) = complaints
            .delete_one(doc! { "_id": complaint_id })
            .session(&mut session)
            .await
        {
            return UseCaseResult::failure(Self::abort(&mut session, "delete complaint", e).await);
        }

        for (collection_name, step) in [
            (HISTORY_COLLECTION, "delete complaint history"),
            (COMMENTS_COLLECTION, "delete complaint comments"),
        ] {
            let collection = self.database.collection::<Document>(collection_name);
            if let Err(e) = collection
                .delete_many(doc! { "complaintId": complaint_id })
                .session(&mut session)
                .await
            {
                return UseCaseResult::failure(Self::abort(&mut session, step, e).await);
            }
        }

        let result = self.finish(session).await;
        if result.is_success() {
            debug!(complaint_id, "Committed complaint delete transaction");
        }
        result
    }
}

/// In-memory UnitOfWork for testing.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryUnitOfWork {
    pub committed: std::sync::Mutex<Vec<(String, Document)>>,
    pub history: std::sync::Mutex<Vec<ComplaintHistory>>,
    pub deleted: std::sync::Mutex<Vec<String>>,
    pub fail_with: Option<String>,
}

#[cfg(test)]
impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn history_rows(&self) -> Vec<ComplaintHistory> {
        self.history.lock().unwrap().clone()
    }

    pub fn commit_count(&self) -> usize {
        self.committed.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(
        &self,
        aggregate: &dyn SerializableAggregate,
        history: &[ComplaintHistory],
    ) -> UseCaseResult<()> {
        if let Some(message) = &self.fail_with {
            return UseCaseResult::failure(UseCaseError::commit(message.clone()));
        }
        self.committed
            .lock()
            .unwrap()
            .push((aggregate.id().to_string(), aggregate.to_document().unwrap()));
        self.history.lock().unwrap().extend_from_slice(history);
        UseCaseResult::success(())
    }

    async fn commit_delete(&self, aggregate: &dyn SerializableAggregate) -> UseCaseResult<()> {
        self.deleted.lock().unwrap().push(aggregate.id().to_string());
        UseCaseResult::success(())
    }

    async fn commit_complaint_delete(&self, complaint_id: &str) -> UseCaseResult<()> {
        self.deleted.lock().unwrap().push(complaint_id.to_string());
        UseCaseResult::success(())
    }
}
