//! # JOSE: JSON Object Signing and Encryption
//!
//! JOSE is an IETF standard for securely transferring data between parties using JSON.
//! This module implements its signing half, the foundation of JSON Web Tokens (JWTs):
//!
//! * JWS (JSON Web Signature): a Header, a Payload (the claims) and a Signature,
//!   each encoded in Base64Url and joined by dots. Only the compact serialization
//!   is supported. See [`rfc7515`] for more details.
//!
//! * JWK (JSON Web Key): a JSON format for representing cryptographic keys, used to
//!   publish the public keys required to verify signatures. See [`rfc7517`] for more details.
//!
//! * JWA (JSON Web Algorithm): the identifiers of the signing algorithms. The `alg`
//!   parameter in the JOSE header identifies which algorithm was used.
//!   See [`rfc7518`] for more details.
//!
//! * JWT (JSON Web Token): the claims carried by a token. See [`rfc7519`] for more details.
//!
//! On top of these sit the two services:
//!
//! * [`Signer`]: mints tokens with a single private key fetched from a [`KeyStore`];
//! * [`Verifier`]: verifies tokens against a published [`KeySet`] and validates their claims.
//!
//! Both take an explicit [`AlgorithmRegistry`]; no algorithm is registered globally.
//!
//! [`rfc7515`]: https://datatracker.ietf.org/doc/html/rfc7515
//! [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
//! [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518
//! [`rfc7519`]: https://datatracker.ietf.org/doc/html/rfc7519

mod constants;
mod jwk_utils;

mod error;
pub use error::JoseError;

mod jwa;
pub use jwa::{HashFunction, JWA, KeyFamily};

mod jwk;
pub use jwk::{JWK, JWKEllipticCurves, JWKKeyOperation, JWKType, JWKUse};

mod raw_key;
pub use raw_key::{EcKey, RSA_MIN_BITS, RawKey, RsaKey, SYMMETRIC_MIN_BITS, SymmetricKey};

mod pem;
pub use pem::{
    KeyParseStrategy, KeyParser, Pkcs1PrivateKey, Pkcs8PrivateKey, PkixPublicKey,
    X509Certificate, parse_pem,
};

mod registry;
pub use registry::{Algorithm, AlgorithmRegistry, SignFn, VerifyFn};

mod jwt;
pub use jwt::{Audience, Claims, NumericDate, UserClaims};

mod jws;
pub use jws::{Header, SignedToken, decode_and_verify, encode_and_sign};

mod validation;
pub use validation::Validation;

mod key;
pub use key::{Key, KeySet, KeyStore, KeyUsage};

mod signer;
pub use signer::{Signer, SignerConfig};

mod verifier;
pub use verifier::{Verifier, VerifierHandle};
