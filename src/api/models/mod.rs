//! API request and response data models.
//!
//! These structures define the public API contract and are annotated with
//! `utoipa` for the served OpenAPI docs. Field names use the camelCase form
//! the upload client sends and expects.

pub mod convert;
