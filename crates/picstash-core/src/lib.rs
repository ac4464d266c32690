//! # Picstash Core
//!
//! Image pipelines for the Picstash image host.
//!
//! This crate provides:
//! - **Identity**: the verified caller (user id, username, role)
//! - **Policy**: composable authorization predicates with tagged decisions
//! - **Pipelines**: upload, listing and deletion over a media store and a
//!   record store injected at construction
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Layer                 │
//! ├─────────────────────────────────────────┤
//! │   Policy (role / owner predicates)      │
//! ├─────────────────────────────────────────┤
//! │   ImageService (upload, list, delete)   │
//! ├────────────────────┬────────────────────┤
//! │     MediaStore     │  ImageRecordStore  │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! Deletion is a two-phase operation across two independent systems: the
//! media object goes first, then the record. There is no transaction; see
//! [`ImageService::delete`] for the residual window.

pub mod error;
pub mod identity;
pub mod pipeline;
pub mod policy;

pub use error::{PipelineError, Result};
pub use identity::{Identity, Role};
pub use pipeline::{ImageService, ListRequest, ListResult, DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, DEFAULT_PAGE};
pub use policy::{authorize, Decision, DenyReason, Requirement};
