use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Contact, Customer, CustomerSummary, Interaction, Lead, LeadReport, NewContact, NewCustomer,
    NewInteraction,
};
use crate::store::{CrmStore, StoreError};

/// Postgres-backed CRM storage.
#[derive(Clone)]
pub struct PgCrmStore {
    pool: PgPool,
}

impl PgCrmStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrmStore for PgCrmStore {
    async fn list_customers(&self) -> Result<Vec<CustomerSummary>, StoreError> {
        let rows = sqlx::query_as::<_, CustomerSummary>(
            r#"
            SELECT c.*, COUNT(ct.id) AS contact_count
            FROM customers c
            LEFT JOIN contacts ct ON ct.customer_id = c.id
            GROUP BY c.id
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer, StoreError> {
        let row = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                name, email, phone, company, industry, website,
                address, city, state, postal_code, country,
                status, customer_type, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company)
        .bind(&customer.industry)
        .bind(&customer.website)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.postal_code)
        .bind(&customer.country)
        .bind(&customer.status)
        .bind(&customer.customer_type)
        .bind(&customer.notes)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Inserted customer {}", row.id);
        Ok(row)
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_contacts(&self, customer_id: Uuid) -> Result<Vec<Contact>, StoreError> {
        let rows = sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE customer_id = $1 ORDER BY is_primary DESC, created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_contact(&self, contact: &NewContact) -> Result<Contact, StoreError> {
        let mut tx = self.pool.begin().await?;

        if contact.is_primary {
            let demoted = sqlx::query(
                "UPDATE contacts SET is_primary = false WHERE customer_id = $1 AND is_primary",
            )
            .bind(contact.customer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if demoted > 0 {
                tracing::info!(
                    "Demoted {} primary contact(s) of customer {}",
                    demoted,
                    contact.customer_id
                );
            }
        }

        let row = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (customer_id, name, email, phone, title, is_primary, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(contact.customer_id)
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.title)
        .bind(contact.is_primary)
        .bind(&contact.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn insert_lead_report(&self, lead: &Lead) -> Result<LeadReport, StoreError> {
        let row = sqlx::query_as::<_, LeadReport>(
            r#"
            INSERT INTO lead_assessment_reports (name, email, company, phone, calculator_results)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.company)
        .bind(&lead.phone)
        .bind(Value::Object(lead.calculator_results.clone()))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_lead_reports(&self) -> Result<Vec<LeadReport>, StoreError> {
        let rows = sqlx::query_as::<_, LeadReport>(
            "SELECT * FROM lead_assessment_reports ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_lead_report(&self, id: Uuid) -> Result<Option<LeadReport>, StoreError> {
        let row =
            sqlx::query_as::<_, LeadReport>("SELECT * FROM lead_assessment_reports WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }

    async fn insert_interaction(
        &self,
        interaction: &NewInteraction,
    ) -> Result<Interaction, StoreError> {
        let row = sqlx::query_as::<_, Interaction>(
            r#"
            INSERT INTO lead_interactions (lead_id, interaction_type, description, notes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(interaction.lead_id)
        .bind(&interaction.interaction_type)
        .bind(&interaction.description)
        .bind(&interaction.notes)
        .bind(interaction.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_interactions(&self, lead_id: Uuid) -> Result<Vec<Interaction>, StoreError> {
        let rows = sqlx::query_as::<_, Interaction>(
            "SELECT * FROM lead_interactions WHERE lead_id = $1 ORDER BY created_at DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
