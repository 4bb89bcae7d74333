use std::fmt;

use crate::error::RemoteError;
use crate::minter::IdMinter;
use crate::records::{Mapping, RemoteDocument, Syncable};
use crate::remote::RemoteClient;

/// Result of syncing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new remote document was created with this identifier.
    Created(String),
    /// The remote document with this identifier was overwritten.
    Updated(String),
    /// A remote call failed after all retries.
    Failed(String),
    /// The record was not sent.
    Skipped(String),
}

impl Outcome {
    /// Remote identifier for successful outcomes.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Outcome::Created(id) | Outcome::Updated(id) => Some(id),
            Outcome::Failed(_) | Outcome::Skipped(_) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created(id) => write!(f, "created {}", id),
            Outcome::Updated(id) => write!(f, "updated {}", id),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Upserts single records against the remote API.
///
/// For each record:
/// 1. Map it to the remote schema (unmappable records are skipped)
/// 2. Resolve its identifier: the stored `remoteId`, else its natural key,
///    else a freshly minted one
/// 3. Update the remote document if it exists, otherwise create it
/// 4. After a create, store the identifier on the record
///
/// Remote failures become [`Outcome::Failed`]; nothing here returns an error,
/// so one bad record never stops its siblings.
#[derive(Debug, Clone, Copy)]
pub struct Synchronizer<'a> {
    client: &'a RemoteClient,
}

impl<'a> Synchronizer<'a> {
    pub fn new(client: &'a RemoteClient) -> Self {
        Self { client }
    }

    pub async fn sync<R: Syncable>(&self, record: &mut R) -> Outcome {
        let mapping = match record.mapping() {
            Ok(mapping) => mapping,
            Err(reason) => {
                tracing::info!(
                    "Skipping record {}: {}",
                    record.local_id().unwrap_or("(no id)"),
                    reason
                );
                return Outcome::Skipped(reason.to_string());
            }
        };

        let kind = mapping.kind;
        let name = match self.resolve_identifier(record.remote_id(), &mapping).await {
            Ok(Some(name)) => name,
            Ok(None) => {
                tracing::info!("Skipping {} record: no identifier", kind);
                return Outcome::Skipped(format!("no identifier for {}", kind));
            }
            Err(e) => {
                tracing::warn!("Failed to mint {} identifier: {}", kind, e);
                return Outcome::Failed(format!("minting {} identifier: {}", kind, e));
            }
        };

        let doc = RemoteDocument::new(kind, name, mapping.fields);
        let exists = match self.client.exists(doc.doctype(), doc.name()).await {
            Ok(exists) => exists,
            Err(e) => return failed(&doc, "checking", e),
        };

        if exists {
            match self.client.update(&doc).await {
                Ok(_) => {
                    tracing::debug!("Updated {} {}", kind, doc.name());
                    Outcome::Updated(doc.name().to_string())
                }
                Err(e) => failed(&doc, "updating", e),
            }
        } else {
            match self.client.create(&doc).await {
                Ok(_) => {
                    tracing::info!("Created {} {}", kind, doc.name());
                    record.set_remote_id(doc.name().to_string());
                    Outcome::Created(doc.name().to_string())
                }
                Err(e) => failed(&doc, "creating", e),
            }
        }
    }

    async fn resolve_identifier(
        &self,
        remote_id: Option<&str>,
        mapping: &Mapping,
    ) -> Result<Option<String>, RemoteError> {
        if let Some(id) = remote_id {
            return Ok(Some(id.to_string()));
        }
        if let Some(key) = &mapping.natural_key {
            return Ok(Some(key.clone()));
        }
        match mapping.kind.id_prefix() {
            Some(prefix) => IdMinter::new(self.client)
                .mint(prefix, mapping.kind.doctype())
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

fn failed(doc: &RemoteDocument, action: &str, e: RemoteError) -> Outcome {
    tracing::warn!("Failed {} {} {}: {}", action, doc.kind(), doc.name(), e);
    Outcome::Failed(format!("{} {} {}: {}", action, doc.doctype(), doc.name(), e))
}
