// Odoo remote API
// Session login + ORM calls over the JSON-RPC web endpoints

pub mod client;

pub use client::{DomainTerm, OdooClient, Session};
