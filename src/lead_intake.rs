//! Lead intake: validation, notification emails and lead recording.
//!
//! Flow for a form submission:
//! 1. Validate required fields and the email shape.
//! 2. Record the lead (best-effort, a failure is logged and ignored).
//! 3. Send the internal sales notice.
//! 4. Send the confirmation to the submitter.
//!
//! Any send failure ends the request with a generic error. Nothing is retried.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::{AppError, ResultExt};
use crate::mailer::{Notifier, OutgoingEmail, SendError};
use crate::models::{clean, Lead, LeadReport, LeadSubmission, LeadSubmitResponse};
use crate::store::CrmStore;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";
pub const INVALID_EMAIL_MESSAGE: &str = "Invalid email format";

/// Calculator keys surfaced in the submitter's confirmation, in display order.
const CONFIRMATION_FIELDS: &[&str] = &[
    "annualSavings",
    "monthlySavings",
    "roi",
    "paybackPeriod",
    "hoursSaved",
    "efficiencyGain",
];

/// Scalar entries shown when none of the known calculator keys are present.
const FALLBACK_FIELD_LIMIT: usize = 5;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

/// Checks the `local@domain.tld` shape: no whitespace, exactly one `@`, and a
/// dot somewhere after it.
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Turns a raw form submission into a [`Lead`].
pub fn validate_submission(submission: LeadSubmission) -> Result<Lead, AppError> {
    let (name, email, company) = match (
        clean(submission.name),
        clean(submission.email),
        clean(submission.company),
    ) {
        (Some(name), Some(email), Some(company)) => (name, email, company),
        _ => return Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
    };

    if !is_valid_email(&email) {
        tracing::warn!("❌ Invalid email in lead submission: {}", email);
        return Err(AppError::Validation(INVALID_EMAIL_MESSAGE.to_string()));
    }

    Ok(Lead {
        name,
        email,
        company,
        phone: clean(submission.phone),
        calculator_results: submission.calculator_results.unwrap_or_default(),
    })
}

/// Escapes text for safe inclusion in an HTML email body.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// "annualSavings" / "payback_period" -> "Annual Savings" / "Payback Period".
fn humanize_key(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in key.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(c);
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .into_iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

/// Picks the calculator entries worth showing to the submitter.
pub fn confirmation_highlights(results: &Map<String, Value>) -> Vec<(String, String)> {
    let known: Vec<(String, String)> = CONFIRMATION_FIELDS
        .iter()
        .filter_map(|key| {
            results
                .get(*key)
                .and_then(display_value)
                .map(|v| (humanize_key(key), v))
        })
        .collect();

    if !known.is_empty() {
        return known;
    }

    results
        .iter()
        .filter_map(|(key, value)| display_value(value).map(|v| (humanize_key(key), v)))
        .take(FALLBACK_FIELD_LIMIT)
        .collect()
}

/// Internal notice for the sales inbox with the full raw payload.
pub fn sales_notification(lead: &Lead, sales_address: &str) -> OutgoingEmail {
    let raw_results = serde_json::to_string_pretty(&lead.calculator_results)
        .unwrap_or_else(|_| "{}".to_string());

    let html = format!(
        r#"<h2>New lead from the website</h2>
<table>
  <tr><td><strong>Name</strong></td><td>{name}</td></tr>
  <tr><td><strong>Email</strong></td><td>{email}</td></tr>
  <tr><td><strong>Company</strong></td><td>{company}</td></tr>
  <tr><td><strong>Phone</strong></td><td>{phone}</td></tr>
</table>
<h3>Calculator results</h3>
<pre>{results}</pre>"#,
        name = escape_html(&lead.name),
        email = escape_html(&lead.email),
        company = escape_html(&lead.company),
        phone = escape_html(lead.phone.as_deref().unwrap_or("Not provided")),
        results = escape_html(&raw_results),
    );

    OutgoingEmail {
        to: sales_address.to_string(),
        subject: format!("New lead: {} ({})", lead.name, lead.company),
        html,
    }
}

/// Confirmation for the person who submitted the form.
pub fn submitter_confirmation(lead: &Lead) -> OutgoingEmail {
    let highlights = confirmation_highlights(&lead.calculator_results);

    let summary = if highlights.is_empty() {
        String::new()
    } else {
        let rows: String = highlights
            .iter()
            .map(|(label, value)| {
                format!(
                    "  <li><strong>{}:</strong> {}</li>\n",
                    escape_html(label),
                    escape_html(value)
                )
            })
            .collect();
        format!("<p>Here is a summary of your results:</p>\n<ul>\n{}</ul>\n", rows)
    };

    let html = format!(
        r#"<h2>Thanks for reaching out, {name}!</h2>
<p>We received your request for {company} and a member of our team will be in touch shortly.</p>
{summary}<p>In the meantime, feel free to book a demo at a time that suits you.</p>"#,
        name = escape_html(&lead.name),
        company = escape_html(&lead.company),
        summary = summary,
    );

    OutgoingEmail {
        to: lead.email.clone(),
        subject: "Thanks for your interest - your results".to_string(),
        html,
    }
}

/// Runs the lead intake flow.
pub struct LeadIntakeService {
    store: Arc<dyn CrmStore>,
    notifier: Option<Notifier>,
}

impl LeadIntakeService {
    pub fn new(store: Arc<dyn CrmStore>, notifier: Option<Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn submit(&self, submission: LeadSubmission) -> Result<LeadSubmitResponse, AppError> {
        let lead = validate_submission(submission)?;

        tracing::info!("Lead received: {} <{}> ({})", lead.name, lead.email, lead.company);

        let lead_id = match self.store.insert_lead_report(&lead).await {
            Ok(report) => Some(report.id),
            Err(e) => {
                tracing::warn!("⚠️  Could not record lead {}: {}", lead.email, e);
                None
            }
        };

        self.send_notifications(&lead)
            .await
            .with_context(|| format!("Lead notification for {}", lead.email))?;

        tracing::info!("✅ Lead emails sent for {}", lead.email);
        Ok(LeadSubmitResponse {
            success: true,
            lead_id,
        })
    }

    async fn send_notifications(&self, lead: &Lead) -> Result<(), AppError> {
        let notifier = self.notifier.as_ref().ok_or(SendError::NotConfigured)?;

        let notice = sales_notification(lead, &notifier.sales_address);
        notifier.mailer.send(&notice).await?;

        let confirmation = submitter_confirmation(lead);
        notifier.mailer.send(&confirmation).await?;

        Ok(())
    }

    /// Recorded leads, newest first.
    pub async fn list(&self) -> Result<Vec<LeadReport>, AppError> {
        self.store
            .list_lead_reports()
            .await
            .context("Failed to fetch leads")
    }
}
