//! Settings Repository

use mongodb::{bson::doc, Collection, Database};

use crate::settings::entity::{SystemSettings, SYSTEM_SETTINGS_ID};
use crate::shared::error::Result;

pub struct SettingsRepository {
    collection: Collection<SystemSettings>,
}

impl SettingsRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("settings"),
        }
    }

    pub async fn find(&self) -> Result<Option<SystemSettings>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": SYSTEM_SETTINGS_ID })
            .await?)
    }

    /// Stored settings, or the defaults when none were saved yet
    pub async fn get(&self) -> Result<SystemSettings> {
        Ok(self.find().await?.unwrap_or_default())
    }

    pub async fn save(&self, settings: &SystemSettings) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": SYSTEM_SETTINGS_ID }, settings)
            .upsert(true)
            .await?;
        Ok(())
    }
}
