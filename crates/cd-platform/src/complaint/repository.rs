//! Complaint Repository

use bson::Document;
use cd_common::{ComplaintStatus, UserRole};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection, Database};

use crate::shared::authorization::AuthContext;
use crate::shared::error::Result;
use crate::Complaint;

/// Listing filters, applied inside the actor's role scope
#[derive(Debug, Clone, Default)]
pub struct ComplaintQuery {
    pub status: Option<ComplaintStatus>,
    pub department_id: Option<String>,
    pub assignee_id: Option<String>,
    pub client_id: Option<String>,
    pub nature_type_id: Option<String>,
    pub search: Option<String>,
}

impl ComplaintQuery {
    /// Role scope first, user filters after, joined with `$and`
    pub fn to_document(&self, actor: &AuthContext) -> Document {
        let mut clauses = vec![role_scope(actor)];

        let mut filter = doc! {};
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(department_id) = &self.department_id {
            filter.insert("departmentId", department_id);
        }
        if let Some(assignee_id) = &self.assignee_id {
            filter.insert("currentAssigneeId", assignee_id);
        }
        if let Some(client_id) = &self.client_id {
            filter.insert("clientId", client_id);
        }
        if let Some(nature_type_id) = &self.nature_type_id {
            filter.insert("natureTypeId", nature_type_id);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = regex::escape(search);
            filter.insert(
                "$or",
                vec![
                    doc! { "title": { "$regex": &pattern, "$options": "i" } },
                    doc! { "description": { "$regex": &pattern, "$options": "i" } },
                ],
            );
        }
        clauses.push(filter);

        clauses.retain(|clause| !clause.is_empty());
        match clauses.len() {
            0 => doc! {},
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        }
    }
}

fn role_scope(actor: &AuthContext) -> Document {
    match actor.role {
        UserRole::Admin => doc! {},
        UserRole::Manager => match &actor.department_id {
            Some(department_id) => doc! { "departmentId": department_id },
            // a manager without a department sees nothing
            None => doc! { "_id": { "$exists": false } },
        },
        UserRole::Employee => doc! { "currentAssigneeId": &actor.user_id },
        UserRole::Client => doc! { "clientId": &actor.user_id },
    }
}

pub struct ComplaintRepository {
    collection: Collection<Complaint>,
}

impl ComplaintRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("complaints"),
        }
    }

    pub async fn insert(&self, complaint: &Complaint) -> Result<()> {
        self.collection.insert_one(complaint).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Complaint>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Complaint>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Newest first
    pub async fn find_page(
        &self,
        query: &ComplaintQuery,
        actor: &AuthContext,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Complaint>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(query.to_document(actor))
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn count(&self, query: &ComplaintQuery, actor: &AuthContext) -> Result<u64> {
        Ok(self.collection.count_documents(query.to_document(actor)).await?)
    }

    pub async fn count_by_department(&self, department_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "departmentId": department_id })
            .await?)
    }

    pub async fn count_by_nature_type(&self, nature_type_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "natureTypeId": nature_type_id })
            .await?)
    }

    /// Complaints still being worked on by this user
    pub async fn count_open_by_assignee(&self, user_id: &str) -> Result<u64> {
        let open: Vec<&str> = ComplaintStatus::all()
            .into_iter()
            .filter(|s| s.is_open())
            .map(|s| s.as_str())
            .collect();
        Ok(self
            .collection
            .count_documents(doc! {
                "currentAssigneeId": user_id,
                "status": { "$in": open },
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: UserRole, department: Option<&str>) -> AuthContext {
        AuthContext {
            user_id: "u1".to_string(),
            email: "u1@desk.io".to_string(),
            name: "U1".to_string(),
            role,
            department_id: department.map(String::from),
        }
    }

    #[test]
    fn test_admin_without_filters_sees_everything() {
        let filter = ComplaintQuery::default().to_document(&ctx(UserRole::Admin, None));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_role_scope() {
        let filter = ComplaintQuery::default().to_document(&ctx(UserRole::Client, None));
        assert_eq!(filter, doc! { "clientId": "u1" });

        let filter = ComplaintQuery::default().to_document(&ctx(UserRole::Employee, Some("it")));
        assert_eq!(filter, doc! { "currentAssigneeId": "u1" });

        let filter = ComplaintQuery::default().to_document(&ctx(UserRole::Manager, Some("it")));
        assert_eq!(filter, doc! { "departmentId": "it" });
    }

    #[test]
    fn test_user_filters_cannot_widen_scope() {
        let query = ComplaintQuery {
            client_id: Some("someone-else".to_string()),
            status: Some(ComplaintStatus::InProgress),
            ..Default::default()
        };
        let filter = query.to_document(&ctx(UserRole::Client, None));
        assert_eq!(
            filter,
            doc! { "$and": [
                { "clientId": "u1" },
                { "status": "In Progress", "clientId": "someone-else" },
            ] }
        );
    }

    #[test]
    fn test_search_is_escaped() {
        let query = ComplaintQuery {
            search: Some("error (500)".to_string()),
            ..Default::default()
        };
        let filter = query.to_document(&ctx(UserRole::Admin, None));
        let clauses = filter.get_array("$or").unwrap();
        let title = clauses[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"error \(500\)");
    }
}
