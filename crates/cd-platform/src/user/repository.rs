//! User Repository

use async_trait::async_trait;
use bson::Document;
use cd_common::UserRole;
use cd_notify::StakeholderDirectory;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection, Database};

use crate::shared::error::Result;
use crate::User;

/// Filters for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub department_id: Option<String>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(role) = self.role {
            filter.insert("role", role.as_str());
        }
        if let Some(department_id) = &self.department_id {
            filter.insert("departmentId", department_id);
        }
        if let Some(active) = self.active {
            filter.insert("isActive", active);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = regex::escape(search);
            filter.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": &pattern, "$options": "i" } },
                    doc! { "email": { "$regex": &pattern, "$options": "i" } },
                ],
            );
        }
        filter
    }
}

pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    pub async fn insert(&self, user: &User) -> Result<()> {
        self.collection.insert_one(user).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = crate::user::entity::normalize_email(email);
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let email = crate::user::entity::normalize_email(email);
        let count = self.collection.count_documents(doc! { "email": email }).await?;
        Ok(count > 0)
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_page(&self, filter: &UserFilter, skip: u64, limit: i64) -> Result<Vec<User>> {
        let options = FindOptions::builder()
            .sort(doc! { "name": 1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(filter.to_document())
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn count(&self, filter: &UserFilter) -> Result<u64> {
        Ok(self.collection.count_documents(filter.to_document()).await?)
    }

    /// Active employees and managers of a department, by name
    pub async fn find_team(&self, department_id: &str) -> Result<Vec<User>> {
        let cursor = self
            .collection
            .find(doc! {
                "departmentId": department_id,
                "isActive": true,
                "role": { "$in": ["employee", "manager"] },
            })
            .sort(doc! { "name": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_active_by_role(&self, role: UserRole) -> Result<Vec<User>> {
        let cursor = self
            .collection
            .find(doc! { "role": role.as_str(), "isActive": true })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn count_by_department(&self, department_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "departmentId": department_id })
            .await?)
    }

    pub async fn count_all(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    pub async fn update(&self, user: &User) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &user.id }, user)
            .await?;
        Ok(())
    }

    pub async fn record_login(&self, id: &str) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "lastLoginAt": bson::DateTime::from_chrono(Utc::now()) } },
            )
            .await?;
        Ok(())
    }

    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "passwordHash": password_hash,
                    "updatedAt": bson::DateTime::from_chrono(Utc::now()),
                } },
            )
            .await?;
        Ok(())
    }

    async fn whatsapp_phones(&self, filter: Document) -> Result<Vec<String>> {
        let users: Vec<User> = self.collection.find(filter).await?.try_collect().await?;
        Ok(users
            .iter()
            .filter_map(|u| u.whatsapp_phone().map(String::from))
            .collect())
    }
}

/// Phone directory for the notification pipeline
#[async_trait]
impl StakeholderDirectory for UserRepository {
    async fn user_phone(&self, user_id: &str) -> anyhow::Result<Option<String>> {
        let user = self.find_by_id(user_id).await?;
        Ok(user.and_then(|u| u.whatsapp_phone().map(String::from)))
    }

    async fn department_manager_phones(&self, department_id: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .whatsapp_phones(doc! {
                "role": "manager",
                "departmentId": department_id,
                "isActive": true,
            })
            .await?)
    }

    async fn admin_phones(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .whatsapp_phones(doc! { "role": "admin", "isActive": true })
            .await?)
    }
}
