//! Complaint History Repository
//!
//! Rows are only ever appended or removed together with their complaint.

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::shared::error::Result;
use crate::ComplaintHistory;

pub struct ComplaintHistoryRepository {
    collection: Collection<ComplaintHistory>,
}

impl ComplaintHistoryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("complaintHistory"),
        }
    }

    pub async fn insert(&self, row: &ComplaintHistory) -> Result<()> {
        self.collection.insert_one(row).await?;
        Ok(())
    }

    /// Oldest first
    pub async fn find_by_complaint(&self, complaint_id: &str) -> Result<Vec<ComplaintHistory>> {
        let cursor = self
            .collection
            .find(doc! { "complaintId": complaint_id })
            .sort(doc! { "timestamp": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn delete_by_complaint(&self, complaint_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "complaintId": complaint_id })
            .await?;
        Ok(result.deleted_count)
    }
}
