use std::{fmt, sync::Arc};

use aws_lc_rs::{
    encoding::{AsDer, Pkcs8V1Der},
    rand::{SecureRandom, SystemRandom},
    rsa::KeySize,
    signature::{EcdsaKeyPair, KeyPair, RsaKeyPair},
};
use tessera_error::{ErrorContext, OpaqueError};
use zeroize::Zeroizing;

use crate::jose::{
    JWA, JWKEllipticCurves, JoseError, KeyFamily,
    jwk_utils::{ec_subject_public_key_info, rsa_subject_public_key_info, strip_leading_zeros},
    pem::encode_pem,
};

/// Smallest RSA modulus tessera generates.
pub const RSA_MIN_BITS: usize = 2048;

/// Smallest symmetric secret tessera generates.
pub const SYMMETRIC_MIN_BITS: usize = 512;

#[derive(Clone, Debug)]
/// Parsed key material, one variant per [`KeyFamily`].
///
/// Cloning is cheap: private key pairs are reference counted and
/// symmetric secrets are zeroized when the last copy is dropped.
pub enum RawKey {
    Rsa(RsaKey),
    Ec(EcKey),
    Symmetric(SymmetricKey),
}

impl RawKey {
    /// Family of this key material.
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Rsa(_) => KeyFamily::Rsa,
            Self::Ec(ec) => KeyFamily::Ec(ec.curve()),
            Self::Symmetric(_) => KeyFamily::Symmetric,
        }
    }

    /// Whether this key material can produce signatures.
    pub fn can_sign(&self) -> bool {
        match self {
            Self::Rsa(rsa) => rsa.key_pair().is_some(),
            Self::Ec(ec) => ec.key_pair().is_some(),
            Self::Symmetric(_) => true,
        }
    }

    /// Generate fresh key material for the given algorithm.
    ///
    /// `bits` is the RSA modulus size (default 2048) or the symmetric
    /// secret size (default 512). It is ignored for elliptic curves,
    /// whose size follows from the algorithm's curve.
    pub fn generate(alg: JWA, bits: Option<usize>) -> Result<Self, JoseError> {
        match alg.family() {
            KeyFamily::Rsa => RsaKey::generate(bits.unwrap_or(RSA_MIN_BITS)).map(Self::Rsa),
            KeyFamily::Ec(curve) => EcKey::generate(curve).map(Self::Ec),
            KeyFamily::Symmetric => Self::generate_symmetric(bits.unwrap_or(SYMMETRIC_MIN_BITS)),
        }
    }

    /// Generate a symmetric secret of `bits / 8` bytes from the system's secure random source.
    pub fn generate_symmetric(bits: usize) -> Result<Self, JoseError> {
        if bits < SYMMETRIC_MIN_BITS {
            return Err(JoseError::KeyTooSmall {
                min_bits: SYMMETRIC_MIN_BITS,
                bits,
            });
        }

        let mut secret = Zeroizing::new(vec![0u8; bits / 8]);
        SystemRandom::new()
            .fill(&mut secret)
            .context("fill symmetric key from system random")
            .map_err(JoseError::KeyGenerationFailure)?;
        Ok(Self::Symmetric(SymmetricKey(secret)))
    }

    /// DER encoded SubjectPublicKeyInfo of this key.
    pub fn public_key_der(&self) -> Result<Vec<u8>, JoseError> {
        match self {
            Self::Rsa(rsa) => Ok(rsa_subject_public_key_info(rsa.modulus(), rsa.exponent())),
            Self::Ec(ec) => Ok(ec_subject_public_key_info(ec.curve(), ec.point())),
            Self::Symmetric(_) => Err(JoseError::Encoding(OpaqueError::from_display(
                "symmetric keys have no public form",
            ))),
        }
    }

    /// PEM encoded SubjectPublicKeyInfo (`PUBLIC KEY`) of this key.
    pub fn to_public_pem(&self) -> Result<String, JoseError> {
        Ok(encode_pem("PUBLIC KEY", &self.public_key_der()?))
    }

    /// PEM encoded PKCS#8 (`PRIVATE KEY`) of this key.
    pub fn to_private_pem(&self) -> Result<Zeroizing<String>, JoseError> {
        let der: Zeroizing<Vec<u8>> = match self {
            Self::Rsa(rsa) => {
                let key_pair = rsa.key_pair().ok_or_else(no_private_material)?;
                let der: Pkcs8V1Der<'static> = key_pair
                    .as_der()
                    .context("encode RSA key pair as PKCS#8")
                    .map_err(JoseError::Encoding)?;
                Zeroizing::new(der.as_ref().to_vec())
            }
            Self::Ec(ec) => {
                let key_pair = ec.key_pair().ok_or_else(no_private_material)?;
                let doc = key_pair
                    .to_pkcs8v1()
                    .context("encode EC key pair as PKCS#8")
                    .map_err(JoseError::Encoding)?;
                Zeroizing::new(doc.as_ref().to_vec())
            }
            Self::Symmetric(_) => {
                return Err(JoseError::Encoding(OpaqueError::from_display(
                    "symmetric keys have no PEM form",
                )));
            }
        };
        Ok(Zeroizing::new(encode_pem("PRIVATE KEY", &der)))
    }
}

fn no_private_material() -> JoseError {
    JoseError::Encoding(OpaqueError::from_display("key has no private material"))
}

#[derive(Clone)]
/// RSA public key, optionally with its private key pair.
pub struct RsaKey {
    n: Vec<u8>,
    e: Vec<u8>,
    key_pair: Option<Arc<RsaKeyPair>>,
}

impl RsaKey {
    /// Wrap a private [`RsaKeyPair`].
    pub fn from_key_pair(key_pair: RsaKeyPair) -> Self {
        let public = key_pair.public_key();
        Self {
            n: public.modulus().big_endian_without_leading_zero().to_vec(),
            e: public.exponent().big_endian_without_leading_zero().to_vec(),
            key_pair: Some(Arc::new(key_pair)),
        }
    }

    /// Create a public only key from its big-endian modulus and exponent.
    pub fn from_public_components(n: &[u8], e: &[u8]) -> Result<Self, JoseError> {
        let n = strip_leading_zeros(n);
        let e = strip_leading_zeros(e);
        if n.is_empty() || e.is_empty() {
            return Err(JoseError::unparsable("empty RSA modulus or exponent"));
        }
        Ok(Self {
            n: n.to_vec(),
            e: e.to_vec(),
            key_pair: None,
        })
    }

    /// Generate a new key pair with a modulus of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self, JoseError> {
        let size = match bits {
            2048 => KeySize::Rsa2048,
            3072 => KeySize::Rsa3072,
            4096 => KeySize::Rsa4096,
            8192 => KeySize::Rsa8192,
            bits if bits < RSA_MIN_BITS => {
                return Err(JoseError::KeyTooSmall {
                    min_bits: RSA_MIN_BITS,
                    bits,
                });
            }
            bits => {
                return Err(JoseError::KeyGenerationFailure(OpaqueError::from_display(
                    format!("unsupported RSA key size {bits}, use 2048, 3072, 4096 or 8192"),
                )));
            }
        };
        let key_pair = RsaKeyPair::generate(size)
            .context("generate RSA key pair")
            .map_err(JoseError::KeyGenerationFailure)?;
        Ok(Self::from_key_pair(key_pair))
    }

    /// Big-endian modulus without leading zeros.
    pub fn modulus(&self) -> &[u8] {
        &self.n
    }

    /// Big-endian public exponent without leading zeros.
    pub fn exponent(&self) -> &[u8] {
        &self.e
    }

    /// Size of the modulus in bits.
    pub fn bits(&self) -> usize {
        match self.n.first() {
            Some(first) => self.n.len() * 8 - first.leading_zeros() as usize,
            None => 0,
        }
    }

    pub(crate) fn key_pair(&self) -> Option<&RsaKeyPair> {
        self.key_pair.as_deref()
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("bits", &self.bits())
            .field("private", &self.key_pair.is_some())
            .finish()
    }
}

#[derive(Clone)]
/// Elliptic curve public key, optionally with its private key pair.
pub struct EcKey {
    curve: JWKEllipticCurves,
    point: Vec<u8>,
    key_pair: Option<Arc<EcdsaKeyPair>>,
}

impl EcKey {
    /// Wrap a private [`EcdsaKeyPair`] on the given curve.
    pub fn from_key_pair(curve: JWKEllipticCurves, key_pair: EcdsaKeyPair) -> Self {
        Self {
            curve,
            point: key_pair.public_key().as_ref().to_vec(),
            key_pair: Some(Arc::new(key_pair)),
        }
    }

    /// Create a public only key from an uncompressed point (`0x04 || x || y`).
    pub fn from_public_point(
        curve: JWKEllipticCurves,
        point: impl Into<Vec<u8>>,
    ) -> Result<Self, JoseError> {
        let point = point.into();
        if point.len() != curve.point_len() || point.first() != Some(&0x04) {
            return Err(JoseError::unparsable(
                "ec public key is not an uncompressed point on its curve",
            ));
        }
        Ok(Self {
            curve,
            point,
            key_pair: None,
        })
    }

    /// Generate a new key pair on the given curve.
    pub fn generate(curve: JWKEllipticCurves) -> Result<Self, JoseError> {
        let key_pair = EcdsaKeyPair::generate(curve.signing_algorithm())
            .context("generate EcdsaKeyPair")
            .map_err(JoseError::KeyGenerationFailure)?;
        Ok(Self::from_key_pair(curve, key_pair))
    }

    /// Curve of this key.
    pub fn curve(&self) -> JWKEllipticCurves {
        self.curve
    }

    /// Uncompressed public point.
    pub fn point(&self) -> &[u8] {
        &self.point
    }

    /// Big-endian x coordinate.
    pub fn x(&self) -> &[u8] {
        let len = self.curve.coordinate_len();
        &self.point[1..1 + len]
    }

    /// Big-endian y coordinate.
    pub fn y(&self) -> &[u8] {
        let len = self.curve.coordinate_len();
        &self.point[1 + len..]
    }

    pub(crate) fn key_pair(&self) -> Option<&EcdsaKeyPair> {
        self.key_pair.as_deref()
    }
}

impl fmt::Debug for EcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcKey")
            .field("curve", &self.curve)
            .field("private", &self.key_pair.is_some())
            .finish()
    }
}

#[derive(Clone)]
/// Shared secret for HMAC algorithms, zeroized on drop.
pub struct SymmetricKey(Zeroizing<Vec<u8>>);

impl SymmetricKey {
    /// Wrap existing secret bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// The secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size of the secret in bits.
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn symmetric_generation_enforces_minimum() {
        let err = RawKey::generate_symmetric(256).unwrap_err();
        assert!(matches!(
            err,
            JoseError::KeyTooSmall {
                min_bits: 512,
                bits: 256
            }
        ));

        let key = RawKey::generate_symmetric(1024).unwrap();
        let RawKey::Symmetric(secret) = &key else {
            panic!("expected symmetric key");
        };
        assert_eq!(secret.as_bytes().len(), 128);
        assert_ne!(secret.as_bytes(), &[0u8; 128][..]);
    }

    #[test]
    fn rsa_generation_sizes() {
        assert!(matches!(
            RsaKey::generate(1024),
            Err(JoseError::KeyTooSmall {
                min_bits: 2048,
                bits: 1024
            })
        ));
        assert!(matches!(
            RsaKey::generate(2500),
            Err(JoseError::KeyGenerationFailure(_))
        ));
        let key = RsaKey::generate(2048).unwrap();
        assert_eq!(key.bits(), 2048);
        assert_eq!(key.exponent(), &[0x01, 0x00, 0x01]);
    }

    #[test]
    fn generated_keys_follow_alg_family() {
        for alg in JWA::ALL {
            let key = RawKey::generate(alg, None).unwrap();
            assert_eq!(key.family(), alg.family(), "{alg}");
            assert!(key.can_sign());
        }
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let key = RawKey::Symmetric(SymmetricKey::new(b"super-secret-value".to_vec()));
        let output = format!("{key:?}");
        assert!(!output.contains("super"));
        assert!(output.contains("bits: 144"));
    }

    #[test]
    fn symmetric_keys_have_no_pem() {
        let key = RawKey::generate_symmetric(512).unwrap();
        assert_err!(key.to_public_pem());
        assert_err!(key.to_private_pem());
    }

    #[test]
    fn public_only_keys_cannot_export_private_pem() {
        let key = RawKey::generate(JWA::ES384, None).unwrap();
        let RawKey::Ec(ec) = &key else {
            panic!("expected ec key");
        };
        let public = RawKey::Ec(EcKey::from_public_point(ec.curve(), ec.point().to_vec()).unwrap());
        assert!(!public.can_sign());
        assert_ok!(public.to_public_pem());
        assert_err!(public.to_private_pem());
    }
}
