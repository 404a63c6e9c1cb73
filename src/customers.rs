use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::store::{CrmStore, StoreError};

pub const NAME_REQUIRED_MESSAGE: &str = "Name is required";
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Customer with this email already exists";
pub const CUSTOMER_NOT_FOUND_MESSAGE: &str = "Customer not found";
pub const EMPTY_IMPORT_MESSAGE: &str = "No customers provided";

impl NewCustomer {
    /// Applies defaults to a payload. `None` when the name is missing.
    pub fn from_payload(payload: CustomerPayload) -> Option<Self> {
        let name = clean(payload.name)?;

        Some(Self {
            name,
            email: clean(payload.email),
            phone: clean(payload.phone),
            company: clean(payload.company),
            industry: clean(payload.industry),
            website: clean(payload.website),
            address: clean(payload.address),
            city: clean(payload.city),
            state: clean(payload.state),
            postal_code: clean(payload.postal_code),
            country: clean(payload.country),
            status: clean(payload.status).unwrap_or_else(|| DEFAULT_CUSTOMER_STATUS.to_string()),
            customer_type: clean(payload.customer_type)
                .unwrap_or_else(|| DEFAULT_CUSTOMER_TYPE.to_string()),
            notes: clean(payload.notes),
        })
    }
}

impl NewContact {
    pub fn from_payload(customer_id: Uuid, payload: ContactPayload) -> Option<Self> {
        let name = clean(payload.name)?;

        Some(Self {
            customer_id,
            name,
            email: clean(payload.email),
            phone: clean(payload.phone),
            title: clean(payload.title),
            is_primary: payload.is_primary.unwrap_or(false),
            notes: clean(payload.notes),
        })
    }
}

/// Sorts contacts primary first, then newest first.
pub fn order_contacts(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Customer and contact operations.
pub struct CustomerService {
    store: Arc<dyn CrmStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    /// All customers with contact counts, newest first.
    pub async fn list(&self) -> Result<Vec<CustomerSummary>, AppError> {
        let customers = self
            .store
            .list_customers()
            .await
            .context("Failed to fetch customers")?;

        tracing::debug!("Listed {} customers", customers.len());
        Ok(customers)
    }

    pub async fn create(&self, payload: CustomerPayload) -> Result<Customer, AppError> {
        let new_customer = NewCustomer::from_payload(payload)
            .ok_or_else(|| AppError::Validation(NAME_REQUIRED_MESSAGE.to_string()))?;

        match self.store.insert_customer(&new_customer).await {
            Ok(customer) => {
                tracing::info!("✓ Customer created: {} ({})", customer.name, customer.id);
                Ok(customer)
            }
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::warn!(
                    "Duplicate customer email {:?} (constraint {})",
                    new_customer.email,
                    constraint
                );
                Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()))
            }
            Err(e) => Err::<Customer, _>(e).context("Failed to create customer"),
        }
    }

    /// Inserts each row independently. A failing row is recorded and the loop
    /// moves on to the next one.
    pub async fn import(&self, rows: Vec<CustomerPayload>) -> Result<ImportReport, AppError> {
        if rows.is_empty() {
            return Err(AppError::Validation(EMPTY_IMPORT_MESSAGE.to_string()));
        }

        let total = rows.len();
        let mut imported = 0;
        let mut errors = Vec::new();

        for (row, payload) in rows.into_iter().enumerate() {
            let name = clean(payload.name.clone());
            let email = clean(payload.email.clone());

            let outcome = match NewCustomer::from_payload(payload) {
                None => Err((ImportFailure::Invalid, NAME_REQUIRED_MESSAGE.to_string())),
                Some(new_customer) => match self.store.insert_customer(&new_customer).await {
                    Ok(_) => Ok(()),
                    Err(StoreError::UniqueViolation(_)) => {
                        Err((ImportFailure::Duplicate, DUPLICATE_EMAIL_MESSAGE.to_string()))
                    }
                    Err(e) => Err((ImportFailure::Failed, e.to_string())),
                },
            };

            match outcome {
                Ok(()) => imported += 1,
                Err((reason, error)) => {
                    tracing::warn!("✗ Import row {} rejected ({:?}): {}", row, reason, error);
                    errors.push(ImportRowError {
                        row,
                        name,
                        email,
                        reason,
                        error,
                    });
                }
            }
        }

        tracing::info!("Customer import complete: {}/{} imported", imported, total);
        Ok(ImportReport {
            imported,
            total,
            errors,
        })
    }

    /// A customer and its ordered contacts. Contacts are only read once the
    /// customer is known to exist.
    pub async fn detail(&self, id: Uuid) -> Result<CustomerDetail, AppError> {
        let customer = self
            .store
            .find_customer(id)
            .await
            .context("Failed to fetch customer")?
            .ok_or_else(|| AppError::NotFound(CUSTOMER_NOT_FOUND_MESSAGE.to_string()))?;

        let mut contacts = self
            .store
            .list_contacts(id)
            .await
            .context("Failed to fetch contacts")?;
        order_contacts(&mut contacts);

        Ok(CustomerDetail { customer, contacts })
    }

    pub async fn add_contact(
        &self,
        customer_id: Uuid,
        payload: ContactPayload,
    ) -> Result<Contact, AppError> {
        let new_contact = NewContact::from_payload(customer_id, payload)
            .ok_or_else(|| AppError::Validation(NAME_REQUIRED_MESSAGE.to_string()))?;

        self.store
            .find_customer(customer_id)
            .await
            .context("Failed to fetch customer")?
            .ok_or_else(|| AppError::NotFound(CUSTOMER_NOT_FOUND_MESSAGE.to_string()))?;

        match self.store.insert_contact(&new_contact).await {
            Ok(contact) => {
                tracing::info!(
                    "✓ Contact {} added to customer {} (primary: {})",
                    contact.id,
                    customer_id,
                    contact.is_primary
                );
                Ok(contact)
            }
            // The customer vanished between the lookup and the insert.
            Err(StoreError::ForeignKeyViolation(_)) => {
                Err(AppError::NotFound(CUSTOMER_NOT_FOUND_MESSAGE.to_string()))
            }
            Err(e) => Err::<Contact, _>(e).context("Failed to create contact"),
        }
    }
}
