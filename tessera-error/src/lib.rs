//! Error types and utilities for tessera.
//!
//! The [`BoxError`] type is a type-erased error type that can be used to represent any error that
//! implements the `std::error::Error` trait and is used for cases where it is usually not
//! that important what specific error type is returned, but rather that an error occurred.
//!
//! Structured errors (such as the JOSE error kinds of `tessera-crypto`) are hand-written enums.
//! They use [`OpaqueError`] to carry an underlying cause without leaking the
//! concrete type of a dependency into their public API.
//!
//! One can use downcasting or [`ErrorExt`] to get to the cause of an error.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

mod ext;
pub use ext::{ErrorContext, ErrorExt, OpaqueError};
