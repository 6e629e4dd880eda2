//! # Soupsync Testkit
//!
//! Test utilities for soupsync.
//!
//! This crate provides:
//! - Test stores with the account and contact soups registered
//! - Locally created hierarchies with controllable dirty flags
//! - Server-shaped batches with nested children
//! - Property-based test generators using proptest
//! - Log setup for tests and benches
//!
//! ## Usage
//!
//! ```rust,ignore
//! use soupsync_testkit::prelude::*;
//!
//! #[test]
//! fn merge_marks_clean() {
//!     let store = TestStore::with_account_contact_soups();
//!     let target = account_contacts_target(RelationshipType::MasterDetail);
//!     let server = ServerHierarchy::generate(2, 3);
//!     // ... merge and assert
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use soupsync_engine::RelationshipType;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
