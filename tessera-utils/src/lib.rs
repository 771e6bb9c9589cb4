//! utilities crate for tessera
//!
//! `tessera-utils` contains the small helpers shared by the
//! tessera crates that do not belong to one of them in particular,
//! such as the builder macro used by the JOSE configuration types.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(hidden)]
#[macro_use]
pub mod macros;

#[doc(hidden)]
pub mod __private {
    pub use paste::paste;
}
