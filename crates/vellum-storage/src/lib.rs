//! # Vellum Storage
//!
//! Collaborator implementations for the Vellum gateway.
//!
//! ## Object stores
//!
//! - **InMemoryObjectStore**: DashMap-backed store for tests and demos
//! - **FsObjectStore**: directory tree on local disk, create-if-absent via hard links
//! - **CountingObjectStore**: decorator recording how many calls reached the inner store
//! - **FaultyObjectStore**: decorator injecting transient failures and latency
//!
//! ## Allowlist sources
//!
//! - **StaticAllowlistSource**: in-process list that tests can swap or take offline
//! - **FileAllowlistSource**: tabular text file, first column of each row
//!
//! ## Example
//!
//! ```rust,ignore
//! use bytes::Bytes;
//! use vellum_core::ObjectStore;
//! use vellum_storage::InMemoryObjectStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryObjectStore::new();
//!     store.create_folder("ActiGraph/PID001/output_PID001/results/");
//!
//!     let folder = "ActiGraph/PID001/output_PID001/results/";
//!     store.create(folder, "data_v1.csv", Bytes::from_static(b"a,b\n")).await.unwrap();
//!
//!     // A second create with the same name never overwrites
//!     assert!(store.create(folder, "data_v1.csv", Bytes::new()).await.is_err());
//! }
//! ```

pub mod allowlist;
pub mod counting;
pub mod fault;
pub mod fs;
pub mod memory;

// Re-exports
pub use allowlist::{FileAllowlistSource, StaticAllowlistSource, parse_allowlist};
pub use counting::{CallCounts, CountingObjectStore};
pub use fault::FaultyObjectStore;
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;

// Re-export the collaborator traits for convenience
pub use vellum_core::{AllowlistSource, ObjectStore, StoreError};

/// Normalize a folder path to the `a/b/c/` form stores key on
pub(crate) fn normalize_folder(folder: &str) -> String {
    let trimmed = folder.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folder() {
        assert_eq!(normalize_folder("a/b/"), "a/b/");
        assert_eq!(normalize_folder("a/b"), "a/b/");
        assert_eq!(normalize_folder("/a/b//"), "a/b/");
        assert_eq!(normalize_folder(""), "");
    }
}
