//! HTTP API Handlers and Routes
//!
//! This module provides the HTTP layer for Decksmith, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Presentations (`/api/presentations`)
//! - `POST /api/presentations` - Create a presentation record
//! - `GET /api/presentations/{id}` - Get a presentation, including its outline once generated
//!
//! ## Outlines (`/api/outlines`)
//! - `GET /api/outlines/stream/{id}` - Stream outline generation as Server-Sent Events
//!
//! Every SSE frame is `event: response` whose data is one of:
//! ```text
//! {"type": "status", "status": "..."}
//! {"type": "chunk", "chunk": "..."}
//! {"type": "error", "detail": "..."}
//! {"type": "complete", "presentation": {...}}
//! ```
//!
//! ## Health
//! - `GET /health` - Health check endpoint

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
