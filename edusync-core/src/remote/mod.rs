//! HTTP client for the remote document API.
//!
//! Documents live under `/api/resource/{doctype}`; every call goes through
//! [`RemoteClient::execute`], which applies authentication, the per-call
//! timeout and the bounded retry loop.

mod client;

pub use client::{count_path, document_path, resource_path, RemoteClient, PING_PATH};
