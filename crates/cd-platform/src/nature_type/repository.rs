//! Nature Type Repository

use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::nature_type::entity::name_key;
use crate::shared::error::Result;
use crate::NatureType;

pub struct NatureTypeRepository {
    collection: Collection<NatureType>,
}

impl NatureTypeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("natureTypes"),
        }
    }

    pub async fn insert(&self, nature_type: &NatureType) -> Result<()> {
        self.collection.insert_one(nature_type).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<NatureType>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<NatureType>> {
        Ok(self
            .collection
            .find_one(doc! { "nameKey": name_key(name) })
            .await?)
    }

    pub async fn find_all(&self, include_inactive: bool) -> Result<Vec<NatureType>> {
        let filter = if include_inactive {
            doc! {}
        } else {
            doc! { "isActive": true }
        };
        let cursor = self.collection.find(filter).sort(doc! { "name": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn update(&self, nature_type: &NatureType) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &nature_type.id }, nature_type)
            .await?;
        Ok(())
    }
}
