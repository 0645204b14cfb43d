//! API layer for HTTP request handling and data models.
//!
//! This module contains the HTTP surface, organized into:
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! The surface is intentionally small:
//!
//! - **Conversion** (`POST /api/convert`): multipart upload, JSON envelope response
//! - **Frontend config** (`GET /api/config`): metadata and limits for the upload page
//! - **Static assets** (everything else): the embedded upload client
//!
//! # OpenAPI Documentation
//!
//! The API endpoints are documented with `utoipa` annotations; the rendered
//! docs are served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
