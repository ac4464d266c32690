//! # Picstash Server
//!
//! HTTP front end for the Picstash image host.
//!
//! This crate provides:
//! - **Authentication**: HS256 JWT verification into an [`picstash_core::Identity`]
//! - **Role gating**: admin-only routes for upload, delete and the admin page
//! - **Multipart intake**: the `image` field is streamed to a temp file
//!   before it is handed to the upload pipeline
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                  Picstash Server                    │
//! ├─────────────────────────────────────────────────────┤
//! │  Request ID │ Auth Middleware │ Role Gate            │
//! ├─────────────────────────────────────────────────────┤
//! │        Image Handlers (upload, get, delete)         │
//! ├─────────────────────────────────────────────────────┤
//! │                   picstash-core                     │
//! │          (policy, upload/list/delete)               │
//! ├──────────────────────────┬──────────────────────────┤
//! │     picstash-media       │    picstash-records      │
//! │  (Cloudinary, memory)    │  (PostgreSQL, memory)    │
//! └──────────────────────────┴──────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod multipart;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use routes::create_router;
pub use server::run_server_with_shutdown;
pub use state::AppState;
