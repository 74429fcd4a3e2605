//! # Vellum Core
//!
//! Core traits, types, and errors for the Vellum artifact gateway.
//!
//! This crate holds everything the gateway and its collaborators agree on,
//! so the same gateway logic runs against an in-memory store in tests and a
//! real store in production.
//!
//! ## Key Traits
//!
//! - [`ObjectStore`]: list / read / link / create-if-absent over a hierarchical store
//! - [`AllowlistSource`]: full read of the externally maintained allowlist
//! - [`Clock`]: time abstraction for testability
//!
//! ## Key Types
//!
//! - [`Principal`]: normalized authenticated identifier
//! - [`ArtifactFolder`]: resolved location of a participant's results
//! - [`VersionedArtifact`]: an immutable, numbered copy of the editable table
//! - [`ObjectEntry`]: a listing entry returned by an [`ObjectStore`]

pub mod artifact;
pub mod error;
pub mod folder;
pub mod mock_clock;
pub mod principal;
pub mod traits;

// Re-export main types
pub use artifact::*;
pub use error::*;
pub use folder::*;
pub use mock_clock::*;
pub use principal::*;
pub use traits::*;
