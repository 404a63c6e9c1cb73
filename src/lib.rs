//! Leadflow API Library
//!
//! Backend for a marketing site: lead intake from the public assessment form
//! plus a small CRM (customers, contacts, lead interactions).
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection, pool management and migrations.
//! - `db_storage`: PostgreSQL implementation of the CRM store.
//! - `store`: Storage trait and storage errors.
//! - `errors`: Error handling types.
//! - `models`: Database rows and request/response payloads.
//! - `mailer`: Outgoing email (SMTP or HTTP mail API).
//! - `lead_intake`: Lead validation, email rendering and delivery.
//! - `customers`: Customer and contact operations, bulk import.
//! - `interactions`: Interactions logged against leads.
//! - `handlers`: HTTP request handlers.
//! - `routes`: Router assembly and OpenAPI document.

pub mod config;
pub mod customers;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod interactions;
pub mod lead_intake;
pub mod mailer;
pub mod models;
pub mod routes;
pub mod store;
