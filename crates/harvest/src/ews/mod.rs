//! Exchange Web Services integration
//!
//! This module provides:
//! - SOAP envelopes for folder listing, id paging and item fetches
//! - Response parsing into the service contract's types
//! - Normalization of raw items into mail records
//! - The ureq-based client implementing [`crate::service::MailService`]

mod client;
mod envelope;
mod normalize;
mod response;
mod xml;

pub use client::{EwsAuth, EwsClient};
pub use normalize::normalize_item;
