use aws_lc_rs::digest::{Digest, SHA256, digest};
use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use tessera_error::{ErrorContext, OpaqueError};
use tessera_utils::macros::generate_set_and_with;

use crate::jose::{EcKey, JWA, JoseError, RawKey, RsaKey, SymmetricKey};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWK`] or JSON Web Key as defined in [`rfc7517`]
///
/// Only public parameters are modelled: private members such as `d`, `p` or `q`
/// are ignored on input and never written on output, like any other unknown member.
/// The octet sequence (`oct`) key is the exception, its `k` parameter is the secret.
///
/// [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517
pub struct JWK {
    /// Identifier of this key within a key set
    kid: String,
    /// Intended algorithm to be used with this key
    alg: JWA,
    #[serde(flatten)]
    key_type: JWKType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#use: Option<JWKUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_ops: Option<Vec<JWKKeyOperation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x5c: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x5t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "x5t#S256")]
    x5t_sha256: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
/// The "kty" (key type) parameter identifies the cryptographic algorithm family used with the key, such as "RSA", "EC", or "oct"
pub enum JWKType {
    RSA {
        n: String,
        e: String,
    },
    /// Elliptic curve
    EC {
        crv: JWKEllipticCurves,
        x: String,
        y: String,
    },
    /// an octet sequence key, which represents a symmetric key
    #[serde(rename = "oct")]
    OCT {
        k: String,
    },
}

impl Serialize for JWKType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Members in lexicographic order, this output is hashed for the thumbprint
        match &self {
            Self::EC { crv, x, y } => {
                let mut state = serializer.serialize_struct("JWKType", 4)?;
                state.serialize_field("crv", crv)?;
                state.serialize_field("kty", "EC")?;
                state.serialize_field("x", x)?;
                state.serialize_field("y", y)?;
                state.end()
            }
            Self::RSA { n, e } => {
                let mut state = serializer.serialize_struct("JWKType", 3)?;
                state.serialize_field("e", e)?;
                state.serialize_field("kty", "RSA")?;
                state.serialize_field("n", n)?;
                state.end()
            }
            Self::OCT { k } => {
                let mut state = serializer.serialize_struct("JWKType", 2)?;
                state.serialize_field("k", k)?;
                state.serialize_field("kty", "oct")?;
                state.end()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JWKEllipticCurves {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl JWKEllipticCurves {
    /// The `crv` value of this curve.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// Size in bytes of a single (x or y) coordinate.
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// Size in bytes of an uncompressed point (`0x04 || x || y`).
    pub const fn point_len(self) -> usize {
        1 + 2 * self.coordinate_len()
    }

    pub(crate) fn from_point_len(len: usize) -> Option<Self> {
        [Self::P256, Self::P384, Self::P521]
            .into_iter()
            .find(|curve| curve.point_len() == len)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`JWKUse`] identifies the intended use of the public key
pub enum JWKUse {
    #[serde(rename = "sig")]
    Signature,
    #[serde(rename = "enc")]
    Encryption,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// [`JWKKeyOperation`] identifies an operation the key is intended for,
/// see section 4.3 of [`rfc7517`].
///
/// [`rfc7517`]: https://datatracker.ietf.org/doc/html/rfc7517#section-4.3
pub enum JWKKeyOperation {
    /// compute digital signature or MAC
    Sign,
    /// verify digital signature or MAC
    Verify,
    /// encrypt content
    Encrypt,
    /// decrypt content and validate decryption, if applicable
    Decrypt,
    /// encrypt key
    WrapKey,
    /// decrypt key and validate decryption, if applicable
    UnwrapKey,
    /// derive key
    DeriveKey,
    /// derive bits not to be used as a key
    DeriveBits,
}

impl JWK {
    /// Create a [`JWK`] from its required members.
    pub fn new(kid: impl Into<String>, alg: JWA, key_type: JWKType) -> Self {
        Self {
            kid: kid.into(),
            alg,
            key_type,
            r#use: Some(JWKUse::Signature),
            key_ops: None,
            x5c: None,
            x5t: None,
            x5t_sha256: None,
        }
    }

    /// Create a [`JWK`] holding the public parameters of the given [`RawKey`]
    /// (or the secret of a symmetric one).
    pub fn from_raw_key(kid: impl Into<String>, alg: JWA, key: &RawKey) -> Result<Self, JoseError> {
        check_family(alg, key)?;
        let key_type = match key {
            RawKey::Rsa(rsa) => JWKType::RSA {
                n: BASE64_URL_SAFE_NO_PAD.encode(rsa.modulus()),
                e: BASE64_URL_SAFE_NO_PAD.encode(rsa.exponent()),
            },
            RawKey::Ec(ec) => JWKType::EC {
                crv: ec.curve(),
                x: BASE64_URL_SAFE_NO_PAD.encode(ec.x()),
                y: BASE64_URL_SAFE_NO_PAD.encode(ec.y()),
            },
            RawKey::Symmetric(secret) => JWKType::OCT {
                k: BASE64_URL_SAFE_NO_PAD.encode(secret.as_bytes()),
            },
        };
        Ok(Self::new(kid, alg, key_type))
    }

    /// Decode the key parameters of this [`JWK`] into a [`RawKey`].
    ///
    /// RSA and EC keys only carry public material.
    pub fn to_raw_key(&self) -> Result<RawKey, JoseError> {
        let key = match &self.key_type {
            JWKType::RSA { n, e } => {
                let n = decode_param(n, "decode RSA modulus")?;
                let e = decode_param(e, "decode RSA exponent")?;
                RawKey::Rsa(RsaKey::from_public_components(&n, &e)?)
            }
            JWKType::EC { crv, x, y } => {
                let x = decode_param(x, "decode ec curve x point")?;
                let y = decode_param(y, "decode ec curve y point")?;
                if x.len() != crv.coordinate_len() || y.len() != crv.coordinate_len() {
                    return Err(JoseError::unparsable(
                        "ec coordinate length does not match curve",
                    ));
                }

                let mut point = Vec::with_capacity(crv.point_len());
                point.push(0x04);
                point.extend_from_slice(&x);
                point.extend_from_slice(&y);
                RawKey::Ec(EcKey::from_public_point(*crv, point)?)
            }
            JWKType::OCT { k } => {
                RawKey::Symmetric(SymmetricKey::new(decode_param(k, "decode oct key")?))
            }
        };
        check_family(self.alg, &key)?;
        Ok(key)
    }

    /// Key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm this key is meant to be used with
    pub fn alg(&self) -> JWA {
        self.alg
    }

    /// Family specific key parameters
    pub fn key_type(&self) -> &JWKType {
        &self.key_type
    }

    /// Intended use of the public key, if declared
    pub fn key_use(&self) -> Option<JWKUse> {
        self.r#use
    }

    /// Operations the key is intended for, if declared
    pub fn key_ops(&self) -> Option<&[JWKKeyOperation]> {
        self.key_ops.as_deref()
    }

    /// X.509 certificate chain (base64 DER), if any
    pub fn x5c(&self) -> Option<&[String]> {
        self.x5c.as_deref()
    }

    /// X.509 certificate SHA-1 thumbprint, if any
    pub fn x5t(&self) -> Option<&str> {
        self.x5t.as_deref()
    }

    /// X.509 certificate SHA-256 thumbprint, if any
    pub fn x5t_sha256(&self) -> Option<&str> {
        self.x5t_sha256.as_deref()
    }

    generate_set_and_with! {
        /// Replace the key identifier
        pub fn kid(mut self, kid: impl Into<String>) -> Self {
            self.kid = kid.into();
            self
        }
    }

    generate_set_and_with! {
        /// Declare (or clear) the intended use of the public key
        pub fn key_use(mut self, key_use: Option<JWKUse>) -> Self {
            self.r#use = key_use;
            self
        }
    }

    generate_set_and_with! {
        /// Declare (or clear) the operations this key is intended for
        pub fn key_ops(mut self, key_ops: Option<Vec<JWKKeyOperation>>) -> Self {
            self.key_ops = key_ops;
            self
        }
    }

    generate_set_and_with! {
        /// Attach (or clear) an X.509 certificate chain
        pub fn x5c(mut self, x5c: Option<Vec<String>>) -> Self {
            self.x5c = x5c;
            self
        }
    }

    generate_set_and_with! {
        /// Attach (or clear) the SHA-1 certificate thumbprint
        pub fn x5t(mut self, x5t: Option<String>) -> Self {
            self.x5t = x5t;
            self
        }
    }

    generate_set_and_with! {
        /// Attach (or clear) the SHA-256 certificate thumbprint
        pub fn x5t_sha256(mut self, x5t_sha256: Option<String>) -> Self {
            self.x5t_sha256 = x5t_sha256;
            self
        }
    }

    /// [`JWKThumb`] as defined in [`rfc7638`] is url safe identifier for a [`JWK`]
    ///
    /// [`rfc7638`]: https://datatracker.ietf.org/doc/html/rfc7638
    pub fn thumb_sha256(&self) -> Result<Digest, OpaqueError> {
        Ok(digest(
            &SHA256,
            &serde_json::to_vec(&self.key_type).context("failed to serialise JWK")?,
        ))
    }

    /// Base64url encoded [`Self::thumb_sha256`], the default key identifier
    /// of generated keys.
    pub fn thumbprint(&self) -> Result<String, JoseError> {
        let thumb = self.thumb_sha256().map_err(JoseError::Encoding)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(thumb.as_ref()))
    }
}

fn decode_param(value: &str, context: &'static str) -> Result<Vec<u8>, JoseError> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .context(context)
        .map_err(JoseError::UnparsableKey)
}

fn check_family(alg: JWA, key: &RawKey) -> Result<(), JoseError> {
    if alg.family() == key.family() {
        Ok(())
    } else {
        Err(JoseError::KeyFamilyMismatch {
            alg: alg.as_str().to_owned(),
            expected: alg.family(),
            found: key.family(),
        })
    }
}
