//! Comment Repository

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::shared::error::Result;
use crate::Comment;

pub struct CommentRepository {
    collection: Collection<Comment>,
}

impl CommentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("comments"),
        }
    }

    pub async fn insert(&self, comment: &Comment) -> Result<()> {
        self.collection.insert_one(comment).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Comment>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Oldest first; internal comments only when `include_internal`
    pub async fn find_by_complaint(
        &self,
        complaint_id: &str,
        include_internal: bool,
    ) -> Result<Vec<Comment>> {
        let mut filter = doc! { "complaintId": complaint_id };
        if !include_internal {
            filter.insert("isInternal", doc! { "$ne": true });
        }
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn update(&self, comment: &Comment) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &comment.id }, comment)
            .await?;
        Ok(())
    }

    /// Delete a comment and every reply beneath it, returning the count
    pub async fn delete_thread(&self, comment_id: &str) -> Result<u64> {
        let mut ids = vec![comment_id.to_string()];
        let mut frontier = vec![comment_id.to_string()];

        while !frontier.is_empty() {
            let replies: Vec<Comment> = self
                .collection
                .find(doc! { "parentId": { "$in": frontier.clone() } })
                .await?
                .try_collect()
                .await?;
            frontier = replies
                .into_iter()
                .map(|r| r.id)
                .filter(|id| !ids.contains(id))
                .collect();
            ids.extend(frontier.iter().cloned());
        }

        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids } })
            .await?;
        Ok(result.deleted_count)
    }
}
