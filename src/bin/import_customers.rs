//! Bulk-loads customers from a JSON file into the CRM.
//!
//! Usage: `import_customers <file.json>`. The file holds either a bare array
//! of customers or `{ "customers": [...] }`.

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use leadflow_api::customers::CustomerService;
use leadflow_api::db::Database;
use leadflow_api::db_storage::PgCrmStore;
use leadflow_api::models::CustomerImportRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadflow_api=info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: import_customers <file.json>")?;
    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("DB_URL"))
        .context("DATABASE_URL must be set")?;

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let request: CustomerImportRequest =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a customer list", path))?;

    let db = Database::new(&database_url).await?;
    let service = CustomerService::new(Arc::new(PgCrmStore::new(db.pool.clone())));

    let report = service
        .import(request.into_rows())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("Imported {}/{} customers", report.imported, report.total);
    for error in &report.errors {
        println!(
            "  row {}: {} ({:?}, email: {})",
            error.row,
            error.error,
            error.reason,
            error.email.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
