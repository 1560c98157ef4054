//! MongoDB Index Initialization
//!
//! Runs once at startup. `createIndexes` is idempotent, so restarts are safe.

use mongodb::{bson::doc, bson::Document, options::IndexOptions, Database, IndexModel};
use tracing::info;

/// Create every index the repositories rely on
pub async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Initializing MongoDB indexes...");

    create_user_indexes(db).await?;
    create_department_indexes(db).await?;
    create_nature_type_indexes(db).await?;
    create_complaint_indexes(db).await?;
    create_history_indexes(db).await?;
    create_comment_indexes(db).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

fn index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().background(true).build())
        .build()
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).background(true).build())
        .build()
}

async fn create_user_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<Document>("users");

    collection
        .create_indexes([
            unique_index(doc! { "email": 1 }),
            index(doc! { "departmentId": 1, "role": 1 }),
            index(doc! { "role": 1 }),
        ])
        .await?;

    info!("Created users indexes");
    Ok(())
}

async fn create_department_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>("departments")
        .create_index(unique_index(doc! { "name": 1 }))
        .await?;

    info!("Created departments indexes");
    Ok(())
}

async fn create_nature_type_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>("natureTypes")
        .create_index(unique_index(doc! { "nameKey": 1 }))
        .await?;

    info!("Created natureTypes indexes");
    Ok(())
}

async fn create_complaint_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<Document>("complaints");

    // Listing is newest first, always scoped by one of these
    collection
        .create_indexes([
            index(doc! { "createdAt": -1 }),
            index(doc! { "clientId": 1, "createdAt": -1 }),
            index(doc! { "departmentId": 1, "createdAt": -1 }),
            index(doc! { "currentAssigneeId": 1, "createdAt": -1 }),
            index(doc! { "status": 1 }),
            index(doc! { "natureTypeId": 1 }),
        ])
        .await?;

    info!("Created complaints indexes");
    Ok(())
}

async fn create_history_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>("complaintHistory")
        .create_index(index(doc! { "complaintId": 1, "timestamp": 1 }))
        .await?;

    info!("Created complaintHistory indexes");
    Ok(())
}

async fn create_comment_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>("comments")
        .create_indexes([
            index(doc! { "complaintId": 1, "createdAt": 1 }),
            index(doc! { "parentId": 1 }),
        ])
        .await?;

    info!("Created comments indexes");
    Ok(())
}
