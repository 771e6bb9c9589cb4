//! Crypto primitives and dependencies used by tessera.
//!
//! This includes:
//! - Javascript object signing (JOSE): JWA, JWK, JWS and JWT claims
//! - Parsing of PEM encoded public and private keys and certificates
//! - Key generation and export
//! - Token signing and verification services
//!
//! # Tessera
//!
//! Crate used by the end-user `tessera` crate and the `tessera` cli alike.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod jose;

pub mod dep {
    //! Dependencies for tessera crypto modules.
    //!
    //! Exported for your convenience

    pub mod aws_lc_rs {
        //! Re-export of the [`aws-lc-rs`] crate.
        //!
        //! [`aws-lc-rs`]: https://docs.rs/aws-lc-rs

        #[doc(inline)]
        pub use aws_lc_rs::*;
    }

    pub mod jiff {
        //! Re-export of the [`jiff`] crate.
        //!
        //! [`jiff`]: https://docs.rs/jiff

        #[doc(inline)]
        pub use jiff::*;
    }

    pub mod x509_parser {
        //! Re-export of the [`x509_parser`] crate.
        //!
        //! [`x509_parser`]: https://docs.rs/x509_parser

        #[doc(inline)]
        pub use x509_parser::*;
    }
}
