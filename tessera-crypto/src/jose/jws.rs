use std::sync::Arc;

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tessera_error::{ErrorContext as _, OpaqueError};
use tessera_utils::macros::generate_set_and_with;

use crate::jose::{Algorithm, AlgorithmRegistry, Claims, JoseError, RawKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Protected header of a compact [`JWS`] token.
///
/// Only used to locate the verification key and to name the algorithm:
/// a verifier always checks the declared algorithm against the one of
/// the key it resolved.
///
/// [`JWS`]: https://datatracker.ietf.org/doc/html/rfc7515
pub struct Header {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    kid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jku: Option<String>,
}

impl Header {
    /// Create a [`Header`] declaring the given algorithm.
    pub fn new(alg: impl Into<String>) -> Self {
        Self {
            kid: String::new(),
            typ: None,
            alg: alg.into(),
            jku: None,
        }
    }

    /// Create a [`Header`] for a JWT (`typ` is `JWT`) signed by the given key.
    pub fn jwt(alg: impl Into<String>, kid: impl Into<String>) -> Self {
        Self::new(alg).with_kid(kid).with_typ("JWT".to_owned())
    }

    /// Key identifier, empty if absent
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Token type tag
    pub fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }

    /// Declared algorithm identifier
    pub fn alg(&self) -> &str {
        &self.alg
    }

    /// URL of the key set holding the verification key
    pub fn jku(&self) -> Option<&str> {
        self.jku.as_deref()
    }

    generate_set_and_with! {
        /// Set the key identifier
        pub fn kid(mut self, kid: impl Into<String>) -> Self {
            self.kid = kid.into();
            self
        }
    }

    generate_set_and_with! {
        /// Set (or clear) the token type tag
        pub fn typ(mut self, typ: Option<String>) -> Self {
            self.typ = typ;
            self
        }
    }

    generate_set_and_with! {
        /// Set (or clear) the key set URL
        pub fn jku(mut self, jku: Option<String>) -> Self {
            self.jku = jku;
            self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A token whose signature has been verified.
///
/// Its claims have not been validated yet, see [`Validation`](crate::jose::Validation).
pub struct SignedToken<C = Claims> {
    header: Header,
    claims: C,
    signature: Vec<u8>,
    compact: String,
}

impl<C> SignedToken<C> {
    /// The decoded header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The decoded claims
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// The raw signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The compact serialization this token was decoded from
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// Consume the token, keeping its claims
    pub fn into_claims(self) -> C {
        self.claims
    }
}

/// Encode header and claims and sign them into a compact serialization
/// (`header.claims.signature`, each segment base64url without padding).
///
/// The algorithm named by the header is resolved from the registry.
pub fn encode_and_sign<C: Serialize>(
    header: &Header,
    claims: &C,
    key: &RawKey,
    registry: &AlgorithmRegistry,
) -> Result<String, JoseError> {
    let algorithm = registry.resolve(header.alg())?;
    sign_compact(header, claims, key, &algorithm)
}

pub(crate) fn sign_compact<C: Serialize>(
    header: &Header,
    claims: &C,
    key: &RawKey,
    algorithm: &Algorithm,
) -> Result<String, JoseError> {
    let header_json = serde_json::to_vec(header)
        .context("serialize header")
        .map_err(JoseError::Encoding)?;
    let claims_json = serde_json::to_vec(claims)
        .context("serialize claims")
        .map_err(JoseError::Encoding)?;

    let mut token = String::with_capacity((header_json.len() + claims_json.len()) * 4 / 3 + 256);
    BASE64_URL_SAFE_NO_PAD.encode_string(&header_json, &mut token);
    token.push('.');
    BASE64_URL_SAFE_NO_PAD.encode_string(&claims_json, &mut token);

    let signature = algorithm.sign(key, token.as_bytes())?;
    token.push('.');
    BASE64_URL_SAFE_NO_PAD.encode_string(&signature, &mut token);
    Ok(token)
}

/// Split and decode a compact serialization and verify its signature.
///
/// `resolve_key` is handed the decoded header and returns the key to verify
/// with; its errors are returned as is. The algorithm named by the header is
/// resolved from the registry. Claims are not validated.
pub fn decode_and_verify<'k, C, F>(
    token: &str,
    registry: &AlgorithmRegistry,
    resolve_key: F,
) -> Result<SignedToken<C>, JoseError>
where
    C: DeserializeOwned,
    F: FnOnce(&Header) -> Result<&'k RawKey, JoseError>,
{
    decode_and_verify_with(token, |header| {
        let key = resolve_key(header)?;
        let algorithm = registry.resolve(header.alg())?;
        Ok((key, algorithm))
    })
}

pub(crate) fn decode_and_verify_with<'k, C, F>(
    token: &str,
    resolve: F,
) -> Result<SignedToken<C>, JoseError>
where
    C: DeserializeOwned,
    F: FnOnce(&Header) -> Result<(&'k RawKey, Arc<Algorithm>), JoseError>,
{
    let mut segments = token.split('.');
    let (Some(header_segment), Some(claims_segment), Some(signature_segment), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(JoseError::MalformedToken(OpaqueError::from_display(
            "compact serialization requires exactly 3 segments",
        )));
    };

    let header: Header = decode_segment(header_segment, "header")?;
    let claims: C = decode_segment(claims_segment, "claims")?;
    let signature = BASE64_URL_SAFE_NO_PAD
        .decode(signature_segment)
        .context("decode signature segment")
        .map_err(JoseError::MalformedToken)?;

    let (key, algorithm) = resolve(&header)?;

    let signing_input = &token[..header_segment.len() + 1 + claims_segment.len()];
    algorithm.verify(key, signing_input.as_bytes(), &signature)?;

    Ok(SignedToken {
        header,
        claims,
        signature,
        compact: token.to_owned(),
    })
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &'static str) -> Result<T, JoseError> {
    let json = BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .with_context(|| format!("decode {name} segment"))
        .map_err(JoseError::MalformedToken)?;
    serde_json::from_slice(&json)
        .with_context(|| format!("parse {name} json"))
        .map_err(JoseError::MalformedToken)
}
