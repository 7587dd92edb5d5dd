//! `trackhub-core`: shared building blocks for the stockroom workspace.
//!
//! This crate contains identifiers and the domain error model only (no IO).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, has_unique_ids};
pub use error::{DomainError, DomainResult};
pub use id::{ItemId, UserId};
