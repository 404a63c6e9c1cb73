//! Shared fixtures for the HTTP-level tests: an in-memory CRM store, a
//! recording mailer and request helpers driving the router with `oneshot`.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use leadflow_api::config::Config;
use leadflow_api::handlers::AppState;
use leadflow_api::mailer::{Mailer, Notifier, OutgoingEmail, SendError, SentEmail};
use leadflow_api::models::*;
use leadflow_api::routes;
use leadflow_api::store::{CrmStore, StoreError};

pub const SALES_ADDRESS: &str = "sales@acme.io";

/// Customer name that makes the memory store fail with a non-constraint error.
pub const EXPLODING_NAME: &str = "explode";

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    contacts: Vec<Contact>,
    leads: Vec<LeadReport>,
    interactions: Vec<Interaction>,
    ticks: i64,
}

impl Tables {
    /// Strictly increasing timestamps so "newest first" is deterministic.
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(self.ticks)
    }
}

/// In-memory [`CrmStore`] mirroring the Postgres constraints.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Number of `list_contacts` calls.
    pub contact_queries: AtomicUsize,
    /// When set, every lead report insert fails.
    pub fail_lead_inserts: AtomicBool,
    /// When set, every read fails.
    pub fail_reads: AtomicBool,
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.tables.lock().unwrap().customers.clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.tables.lock().unwrap().contacts.clone()
    }

    pub fn leads(&self) -> Vec<LeadReport> {
        self.tables.lock().unwrap().leads.clone()
    }
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn list_customers(&self) -> Result<Vec<CustomerSummary>, StoreError> {
        self.check_reads()?;
        let tables = self.tables.lock().unwrap();
        let mut summaries: Vec<CustomerSummary> = tables
            .customers
            .iter()
            .map(|c| CustomerSummary {
                customer: c.clone(),
                contact_count: tables
                    .contacts
                    .iter()
                    .filter(|ct| ct.customer_id == c.id)
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| b.customer.created_at.cmp(&a.customer.created_at));
        Ok(summaries)
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer, StoreError> {
        if customer.name == EXPLODING_NAME {
            return Err(unavailable());
        }

        let mut tables = self.tables.lock().unwrap();
        if customer.email.is_some()
            && tables.customers.iter().any(|c| c.email == customer.email)
        {
            return Err(StoreError::UniqueViolation("customers_email_key".to_string()));
        }

        let created_at = tables.now();
        let row = Customer {
            id: Uuid::new_v4(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            company: customer.company.clone(),
            industry: customer.industry.clone(),
            website: customer.website.clone(),
            address: customer.address.clone(),
            city: customer.city.clone(),
            state: customer.state.clone(),
            postal_code: customer.postal_code.clone(),
            country: customer.country.clone(),
            status: customer.status.clone(),
            customer_type: customer.customer_type.clone(),
            notes: customer.notes.clone(),
            created_at,
            updated_at: Some(created_at),
        };
        tables.customers.push(row.clone());
        Ok(row)
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        self.check_reads()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn list_contacts(&self, customer_id: Uuid) -> Result<Vec<Contact>, StoreError> {
        self.contact_queries.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let tables = self.tables.lock().unwrap();
        // Insertion order on purpose; the service is responsible for ordering.
        Ok(tables
            .contacts
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn insert_contact(&self, contact: &NewContact) -> Result<Contact, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.customers.iter().any(|c| c.id == contact.customer_id) {
            return Err(StoreError::ForeignKeyViolation(
                "contacts_customer_id_fkey".to_string(),
            ));
        }

        if contact.is_primary {
            for existing in tables
                .contacts
                .iter_mut()
                .filter(|c| c.customer_id == contact.customer_id)
            {
                existing.is_primary = false;
            }
        }

        let row = Contact {
            id: Uuid::new_v4(),
            customer_id: contact.customer_id,
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            title: contact.title.clone(),
            is_primary: contact.is_primary,
            notes: contact.notes.clone(),
            created_at: tables.now(),
        };
        tables.contacts.push(row.clone());
        Ok(row)
    }

    async fn insert_lead_report(&self, lead: &Lead) -> Result<LeadReport, StoreError> {
        if self.fail_lead_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let mut tables = self.tables.lock().unwrap();
        let row = LeadReport {
            id: Uuid::new_v4(),
            name: lead.name.clone(),
            email: lead.email.clone(),
            company: lead.company.clone(),
            phone: lead.phone.clone(),
            calculator_results: Value::Object(lead.calculator_results.clone()),
            created_at: tables.now(),
        };
        tables.leads.push(row.clone());
        Ok(row)
    }

    async fn list_lead_reports(&self) -> Result<Vec<LeadReport>, StoreError> {
        self.check_reads()?;
        let tables = self.tables.lock().unwrap();
        let mut leads = tables.leads.clone();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn find_lead_report(&self, id: Uuid) -> Result<Option<LeadReport>, StoreError> {
        self.check_reads()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn insert_interaction(
        &self,
        interaction: &NewInteraction,
    ) -> Result<Interaction, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.leads.iter().any(|l| l.id == interaction.lead_id) {
            return Err(StoreError::ForeignKeyViolation(
                "lead_interactions_lead_id_fkey".to_string(),
            ));
        }

        let row = Interaction {
            id: Uuid::new_v4(),
            lead_id: interaction.lead_id,
            interaction_type: interaction.interaction_type.clone(),
            description: interaction.description.clone(),
            notes: interaction.notes.clone(),
            created_at: interaction.created_at,
        };
        tables.interactions.push(row.clone());
        Ok(row)
    }

    async fn list_interactions(&self, lead_id: Uuid) -> Result<Vec<Interaction>, StoreError> {
        self.check_reads()?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Interaction> = tables
            .interactions
            .iter()
            .filter(|i| i.lead_id == lead_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

/// Mailer that records every attempted send.
#[derive(Default)]
pub struct RecordingMailer {
    attempts: Mutex<Vec<OutgoingEmail>>,
    /// Zero-based attempt number that should fail.
    fail_on: Mutex<Option<usize>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(attempt: usize) -> Arc<Self> {
        let mailer = Self::default();
        *mailer.fail_on.lock().unwrap() = Some(attempt);
        Arc::new(mailer)
    }

    pub fn attempts(&self) -> Vec<OutgoingEmail> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, SendError> {
        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts.len();
        attempts.push(email.clone());

        if *self.fail_on.lock().unwrap() == Some(attempt) {
            return Err(SendError::Rejected {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }

        Ok(SentEmail {
            provider_id: Some(format!("msg-{}", attempt)),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgresql://localhost/leadflow_test".to_string(),
        port: 3000,
        run_migrations: false,
        rate_limit: None,
        mail: None,
    }
}

/// Router over the memory store. `mailer: None` leaves mail unconfigured.
pub fn test_app(store: Arc<MemoryStore>, mailer: Option<Arc<RecordingMailer>>) -> Router {
    let state = Arc::new(AppState {
        config: test_config(),
        store,
        notifier: mailer.map(|m| Notifier::new(m, SALES_ADDRESS)),
    });
    routes::app(state).expect("router builds without rate limiting")
}

/// Sends one request and returns the status with the JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}
