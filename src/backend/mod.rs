//! Search backend seam.
//!
//! The dispatchers only talk to the backend through [`SearchBackend`]:
//! acquire a connection, then run a query, a multi-search batch or a count.
//! [`HttpSearchBackend`] is the production implementation.

mod http;

#[cfg(test)]
pub(crate) mod scripted;

pub use http::{BackendConnection, HttpSearchBackend};

use async_trait::async_trait;

use crate::error::Result;

/// Executes raw requests against the document-search backend.
///
/// Implementations must be safe to share between concurrent fan-out tasks.
/// Every method returns the raw JSON response body untouched.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    type Connection: Send + Sync;

    async fn acquire_connection(&self) -> Result<Self::Connection>;

    /// Runs one search `body` against the index `alias`.
    async fn execute_query(
        &self,
        body: &str,
        alias: &str,
        conn: &Self::Connection,
    ) -> Result<String>;

    /// Sends a newline-delimited header/body batch in a single request.
    async fn execute_batch(&self, conn: &Self::Connection, batch_body: &str) -> Result<String>;

    /// Runs `body` against the count endpoint of `alias`.
    async fn execute_count(
        &self,
        body: &str,
        alias: &str,
        conn: &Self::Connection,
    ) -> Result<String>;
}
