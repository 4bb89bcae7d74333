//! Canonical identifier minting.
//!
//! Identifiers look like `EDU-STU-2025-00042`: a per-kind prefix, the current
//! year and the remote document count plus one, zero-padded to five digits.
//!
//! Minting reads the count and formats it; nothing is reserved on the remote.
//! Two concurrent runs can therefore mint the same identifier, so runs must be
//! serialized by whoever schedules them.

use chrono::{Datelike, Utc};

use crate::error::RemoteError;
use crate::remote::RemoteClient;

/// Formats `{prefix}-{year}-{counter:05}`.
pub fn format_identifier(prefix: &str, year: i32, counter: u64) -> String {
    format!("{}-{}-{:05}", prefix, year, counter)
}

/// Mints identifiers from the remote document count.
#[derive(Debug, Clone, Copy)]
pub struct IdMinter<'a> {
    client: &'a RemoteClient,
}

impl<'a> IdMinter<'a> {
    pub fn new(client: &'a RemoteClient) -> Self {
        Self { client }
    }

    /// Mints the next identifier for `doctype`.
    ///
    /// Call immediately before creating the document to keep the window
    /// between count and create small.
    pub async fn mint(&self, prefix: &str, doctype: &str) -> Result<String, RemoteError> {
        let count = self.client.count(doctype).await?;
        let id = format_identifier(prefix, Utc::now().year(), count + 1);
        tracing::debug!("Minted {} ({} existing {} documents)", id, count, doctype);
        Ok(id)
    }
}
