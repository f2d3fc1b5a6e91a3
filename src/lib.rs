//! folio-migrate - Portfolio platform migration tooling
//!
//! Moves a multi-tenant portfolio platform from Supabase to Cloud Firestore:
//! copies tables into collections, rewrites stale owner identifiers and
//! audits that each profile's records are still reachable.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
