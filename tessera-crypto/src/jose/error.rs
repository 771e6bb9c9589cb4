use std::fmt;

use tessera_error::{BoxError, OpaqueError};

use crate::jose::{JWA, KeyFamily, NumericDate};

#[derive(Debug)]
/// Every failure produced by the JOSE module.
///
/// The variants are structured so callers can match on the kind of failure
/// rather than on a message. Variants that wrap a failure of another layer
/// (a decoder, the crypto backend or a key store) expose it as their
/// [`source`](std::error::Error::source).
pub enum JoseError {
    /// No algorithm with this identifier is registered.
    UnknownAlgorithm { alg: String },
    /// An algorithm with this identifier is already registered.
    AlgorithmAlreadyRegistered { alg: String },
    /// The input carries no PEM block.
    NotPemEncoded(OpaqueError),
    /// None of the parse strategies (or JWK parameters) produced usable key material.
    UnparsableKey(OpaqueError),
    /// Requested or provided key is smaller than the accepted minimum.
    KeyTooSmall { min_bits: usize, bits: usize },
    /// The random source or the crypto backend failed to produce a key.
    KeyGenerationFailure(OpaqueError),
    /// Key material of the wrong family (or curve) for an algorithm.
    KeyFamilyMismatch {
        alg: String,
        expected: KeyFamily,
        found: KeyFamily,
    },
    /// No key with this identifier exists.
    UnknownKeyId { kid: String },
    /// A key set already contains a key with this identifier.
    DuplicateKeyId { kid: String },
    /// A signing operation was requested with a key lacking private material.
    MissingPrivateKey { kid: String },
    /// Algorithm declared by a token header differs from the resolved key's algorithm.
    AlgorithmMismatch { expected: JWA, found: String },
    /// Token is not a well formed compact serialization.
    MalformedToken(OpaqueError),
    /// Signature does not match the signing input.
    SignatureInvalid,
    /// `now` is past the expiration time (plus leeway).
    TokenExpired { exp: NumericDate, now: NumericDate },
    /// `now` is before the not-before time (minus leeway).
    TokenNotYetValid { nbf: NumericDate, now: NumericDate },
    /// Issuer claim is absent or differs from the expected issuer.
    IssuerMismatch {
        expected: String,
        found: Option<String>,
    },
    /// A claim required for validation is absent.
    MissingClaim { claim: &'static str },
    /// Aggregate error surfaced by a verifier when claims validation fails.
    InvalidToken(Box<Self>),
    /// The key store or key set provider failed.
    KeyStore(BoxError),
    /// JSON encoding failed.
    Encoding(OpaqueError),
    /// The crypto backend failed to produce a signature.
    Signing(OpaqueError),
}

impl JoseError {
    /// Returns the claims validation failure wrapped by [`JoseError::InvalidToken`],
    /// or `self` for any other kind.
    pub fn validation_cause(&self) -> &Self {
        match self {
            Self::InvalidToken(inner) => inner.as_ref(),
            other => other,
        }
    }

    pub(crate) fn unparsable(msg: &'static str) -> Self {
        Self::UnparsableKey(OpaqueError::from_display(msg))
    }

    pub(crate) fn from_key_store(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<Self>() {
            Ok(err) => *err,
            Err(err) => Self::KeyStore(err),
        }
    }
}

impl fmt::Display for JoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm { alg } => write!(f, "unknown algorithm '{alg}'"),
            Self::AlgorithmAlreadyRegistered { alg } => {
                write!(f, "algorithm '{alg}' is already registered")
            }
            Self::NotPemEncoded(_) => write!(f, "input is not PEM encoded"),
            Self::UnparsableKey(_) => write!(f, "unparsable key material"),
            Self::KeyTooSmall { min_bits, bits } => {
                write!(f, "key of {bits} bits is too small (minimum: {min_bits} bits)")
            }
            Self::KeyGenerationFailure(_) => write!(f, "key generation failed"),
            Self::KeyFamilyMismatch {
                alg,
                expected,
                found,
            } => write!(f, "algorithm {alg} requires a {expected} key, got a {found} key"),
            Self::UnknownKeyId { kid } => write!(f, "unknown key id '{kid}'"),
            Self::DuplicateKeyId { kid } => write!(f, "duplicate key id '{kid}'"),
            Self::MissingPrivateKey { kid } => write!(f, "key '{kid}' has no private material"),
            Self::AlgorithmMismatch { expected, found } => {
                write!(f, "algorithm mismatch: key uses {expected}, token declares '{found}'")
            }
            Self::MalformedToken(_) => write!(f, "malformed token"),
            Self::SignatureInvalid => write!(f, "invalid signature"),
            Self::TokenExpired { exp, now } => write!(f, "token expired at {exp} (now: {now})"),
            Self::TokenNotYetValid { nbf, now } => {
                write!(f, "token not valid before {nbf} (now: {now})")
            }
            Self::IssuerMismatch { expected, found } => match found {
                Some(found) => write!(f, "issuer mismatch: expected '{expected}', got '{found}'"),
                None => write!(f, "issuer mismatch: expected '{expected}', got none"),
            },
            Self::MissingClaim { claim } => write!(f, "missing claim '{claim}'"),
            Self::InvalidToken(_) => write!(f, "invalid token"),
            Self::KeyStore(_) => write!(f, "key store failure"),
            Self::Encoding(_) => write!(f, "encoding failure"),
            Self::Signing(_) => write!(f, "signing failure"),
        }
    }
}

impl std::error::Error for JoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotPemEncoded(err)
            | Self::UnparsableKey(err)
            | Self::KeyGenerationFailure(err)
            | Self::MalformedToken(err)
            | Self::Encoding(err)
            | Self::Signing(err) => Some(err),
            Self::InvalidToken(err) => Some(err.as_ref()),
            Self::KeyStore(err) => Some(err.as_ref()),
            Self::UnknownAlgorithm { .. }
            | Self::AlgorithmAlreadyRegistered { .. }
            | Self::KeyTooSmall { .. }
            | Self::KeyFamilyMismatch { .. }
            | Self::UnknownKeyId { .. }
            | Self::DuplicateKeyId { .. }
            | Self::MissingPrivateKey { .. }
            | Self::AlgorithmMismatch { .. }
            | Self::SignatureInvalid
            | Self::TokenExpired { .. }
            | Self::TokenNotYetValid { .. }
            | Self::IssuerMismatch { .. }
            | Self::MissingClaim { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_error::ErrorExt;

    #[test]
    fn invalid_token_exposes_cause() {
        let err = JoseError::InvalidToken(Box::new(JoseError::TokenExpired {
            exp: NumericDate::from_seconds(10),
            now: NumericDate::from_seconds(11),
        }));
        assert!(matches!(
            err.validation_cause(),
            JoseError::TokenExpired { .. }
        ));
        assert_eq!(2, err.chain().count());
    }

    #[test]
    fn key_store_errors_of_own_kind_are_unwrapped() {
        let err = JoseError::from_key_store(JoseError::UnknownKeyId {
            kid: "abc".to_owned(),
        });
        assert!(matches!(err, JoseError::UnknownKeyId { kid } if kid == "abc"));

        let err = JoseError::from_key_store("database offline");
        assert!(matches!(err, JoseError::KeyStore(_)));
        assert_eq!(err.root_cause().to_string(), "database offline");
    }

    #[test]
    fn display_is_lowercase_and_structured() {
        let err = JoseError::KeyTooSmall {
            min_bits: 512,
            bits: 256,
        };
        assert_eq!(
            err.to_string(),
            "key of 256 bits is too small (minimum: 512 bits)"
        );
    }
}
