//! Datastore seam.
//!
//! Every handler talks to the hosted Postgres backend through [`CrmStore`], so
//! the request logic can run against any implementation. The production one
//! lives in [`crate::db_storage`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Contact, Customer, CustomerSummary, Interaction, Lead, LeadReport, NewContact, NewCustomer,
    NewInteraction,
};

/// Datastore failures, classified so callers can react to constraint errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A foreign key pointed at a record that does not exist.
    #[error("referenced record does not exist: {0}")]
    ForeignKeyViolation(String),

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Read/write operations over the `customers`, `contacts`,
/// `lead_assessment_reports` and `lead_interactions` collections.
#[async_trait]
pub trait CrmStore: Send + Sync {
    /// All customers with their contact counts, newest first.
    async fn list_customers(&self) -> Result<Vec<CustomerSummary>, StoreError>;

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer, StoreError>;

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;

    /// Contacts of one customer, primary first, then newest first.
    async fn list_contacts(&self, customer_id: Uuid) -> Result<Vec<Contact>, StoreError>;

    /// Inserts a contact. A primary contact demotes the customer's existing
    /// primaries atomically.
    async fn insert_contact(&self, contact: &NewContact) -> Result<Contact, StoreError>;

    async fn insert_lead_report(&self, lead: &Lead) -> Result<LeadReport, StoreError>;

    /// All recorded leads, newest first.
    async fn list_lead_reports(&self) -> Result<Vec<LeadReport>, StoreError>;

    async fn find_lead_report(&self, id: Uuid) -> Result<Option<LeadReport>, StoreError>;

    async fn insert_interaction(
        &self,
        interaction: &NewInteraction,
    ) -> Result<Interaction, StoreError>;

    /// Interactions logged against one lead, newest first.
    async fn list_interactions(&self, lead_id: Uuid) -> Result<Vec<Interaction>, StoreError>;
}
