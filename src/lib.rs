//! 🔏 Tessera is a JOSE toolkit for the 🦀 Rust language: sign and verify
//! JSON Web Tokens with keys you generate, parse from PEM or fetch as a published key set.
//!
//! | category | support list |
//! |-|-|
//! | ✅ [algorithms](crate::jose::JWA) | ✅ HS256/384/512 ⸱ ✅ RS256/384/512 ⸱ ✅ PS256/384/512 ⸱ ✅ ES256/384/512 |
//! | ✅ [keys](crate::jose::Key) | ✅ [PEM parsing](crate::jose::KeyParser) ⸱ ✅ [generation](crate::jose::Key::generate) ⸱ ✅ [JWK](crate::jose::JWK) ⸱ ✅ [JWK Set](crate::jose::KeySet) |
//! | ✅ tokens | ✅ [compact JWS](crate::jose::encode_and_sign) ⸱ ✅ [JWT claims](crate::jose::Claims) ⸱ ✅ [validation](crate::jose::Validation) ⸱ ❌ JWE |
//! | ✅ services | ✅ [Signer](crate::jose::Signer) ⸱ ✅ [Verifier](crate::jose::Verifier) ⸱ ✅ [key rotation](crate::jose::VerifierHandle) |
//! | ✅ binary | ✅ keygen ⸱ ✅ jwks ⸱ ✅ sign ⸱ ✅ verify |
//!
//! # Example
//!
//! ```
//! use tessera::jose::{
//!     AlgorithmRegistry, Claims, JWA, Key, KeySet, Signer, SignerConfig, Verifier,
//! };
//!
//! let registry = AlgorithmRegistry::with_defaults();
//! let key = Key::generate(JWA::ES256, None)?;
//! let keys = KeySet::new().with_key(key.clone())?;
//!
//! let signer = Signer::new(&keys, SignerConfig::new("auth.example.com", key.kid()), &registry)?;
//! let token = signer.create(Claims {
//!     scopes: Some(vec!["owner".to_owned()]),
//!     ..Default::default()
//! })?;
//!
//! // only public material is published
//! let published: KeySet = serde_json::from_str(&serde_json::to_string(&keys)?)?;
//! let verifier = Verifier::new(&published, "auth.example.com", &registry)?;
//! let verified = verifier.verify(&token)?;
//! assert!(Verifier::verify_scopes(verified.claims(), &["owner"], &[] as &[&str]));
//! # Ok::<(), tessera::error::BoxError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod error {
    //! Error utilities for tessera, see [`tessera_error`].

    #[doc(inline)]
    pub use ::tessera_error::*;
}

pub mod utils {
    //! Utilities for tessera, see [`tessera_utils`].

    #[doc(inline)]
    pub use ::tessera_utils::*;
}

pub mod crypto {
    //! Crypto primitives, see [`tessera_crypto`].

    #[doc(inline)]
    pub use ::tessera_crypto::*;
}

#[doc(inline)]
pub use ::tessera_crypto::jose;
