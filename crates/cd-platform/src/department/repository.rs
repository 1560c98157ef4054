//! Department Repository

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::shared::error::Result;
use crate::Department;

pub struct DepartmentRepository {
    collection: Collection<Department>,
}

impl DepartmentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("departments"),
        }
    }

    pub async fn insert(&self, department: &Department) -> Result<()> {
        self.collection.insert_one(department).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Department>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Case-insensitive name lookup
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Department>> {
        let pattern = format!("^{}$", regex::escape(name.trim()));
        Ok(self
            .collection
            .find_one(doc! { "name": { "$regex": pattern, "$options": "i" } })
            .await?)
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Department>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// All departments by name, optionally only active ones
    pub async fn find_all(&self, active_only: bool) -> Result<Vec<Department>> {
        let filter = if active_only {
            doc! { "isActive": true }
        } else {
            doc! {}
        };
        let cursor = self.collection.find(filter).sort(doc! { "name": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn update(&self, department: &Department) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &department.id }, department)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
