//! Shared response envelope types for API handlers.
//!
//! Resource-style endpoints use a `{ "data": ... }` envelope. The callback
//! acknowledgement and the poll response keep the flat shape the provider
//! and the frontend already consume.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
