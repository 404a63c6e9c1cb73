use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::lead_intake::MISSING_FIELDS_MESSAGE;
use crate::models::{clean, Interaction, InteractionPayload, NewInteraction};
use crate::store::{CrmStore, StoreError};

pub const INVALID_LEAD_ID_MESSAGE: &str = "Invalid lead_id";
pub const LEAD_NOT_FOUND_MESSAGE: &str = "Lead not found";

impl NewInteraction {
    /// Validates a payload and stamps it with the current time.
    pub fn from_payload(payload: InteractionPayload) -> Result<Self, AppError> {
        let (lead_id, interaction_type, description) = match (
            clean(payload.lead_id),
            clean(payload.interaction_type),
            clean(payload.description),
        ) {
            (Some(lead_id), Some(kind), Some(description)) => (lead_id, kind, description),
            _ => return Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
        };

        let lead_id = Uuid::parse_str(&lead_id)
            .map_err(|_| AppError::Validation(INVALID_LEAD_ID_MESSAGE.to_string()))?;

        Ok(Self {
            lead_id,
            interaction_type,
            description,
            notes: clean(payload.notes),
            created_at: Utc::now(),
        })
    }
}

/// Touchpoints logged against leads.
pub struct InteractionService {
    store: Arc<dyn CrmStore>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, payload: InteractionPayload) -> Result<Interaction, AppError> {
        let interaction = NewInteraction::from_payload(payload)?;

        match self.store.insert_interaction(&interaction).await {
            Ok(created) => {
                tracing::info!(
                    "✓ Interaction '{}' logged for lead {}",
                    created.interaction_type,
                    created.lead_id
                );
                Ok(created)
            }
            Err(StoreError::ForeignKeyViolation(_)) => {
                Err(AppError::NotFound(LEAD_NOT_FOUND_MESSAGE.to_string()))
            }
            Err(e) => Err::<Interaction, _>(e).context("Failed to create interaction"),
        }
    }

    /// Interactions of one lead, newest first.
    pub async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<Interaction>, AppError> {
        self.store
            .find_lead_report(lead_id)
            .await
            .context("Failed to fetch lead")?
            .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND_MESSAGE.to_string()))?;

        self.store
            .list_interactions(lead_id)
            .await
            .context("Failed to fetch interactions")
    }
}
