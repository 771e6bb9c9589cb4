use std::{collections::HashMap, fmt, sync::Arc};

use aws_lc_rs::{
    hmac,
    rand::SystemRandom,
    signature::{
        self, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
        RSA_PKCS1_SHA256, RSA_PKCS1_SHA384, RSA_PKCS1_SHA512, RSA_PSS_2048_8192_SHA256,
        RSA_PSS_2048_8192_SHA384, RSA_PSS_2048_8192_SHA512, RSA_PSS_SHA256, RSA_PSS_SHA384,
        RSA_PSS_SHA512, RsaEncoding, RsaParameters, RsaPublicKeyComponents,
    },
};
use tessera_error::{ErrorContext, OpaqueError};

use crate::jose::{HashFunction, JWA, JoseError, KeyFamily, RawKey};

/// Sign operation of an [`Algorithm`]: signing input in, signature bytes out.
pub type SignFn = Arc<dyn Fn(&RawKey, &[u8]) -> Result<Vec<u8>, JoseError> + Send + Sync>;

/// Verify operation of an [`Algorithm`]: signing input and signature in.
pub type VerifyFn = Arc<dyn Fn(&RawKey, &[u8], &[u8]) -> Result<(), JoseError> + Send + Sync>;

#[derive(Clone)]
/// A named pair of sign and verify operations together with the
/// key family they require.
///
/// An [`Algorithm`] checks the family of the key it is handed before
/// invoking its operations, so the operations can rely on receiving
/// the [`RawKey`] variant they expect.
pub struct Algorithm {
    id: String,
    family: KeyFamily,
    hash: HashFunction,
    sign: SignFn,
    verify: VerifyFn,
}

impl Algorithm {
    /// Create a custom [`Algorithm`].
    pub fn new<S, V>(
        id: impl Into<String>,
        family: KeyFamily,
        hash: HashFunction,
        sign: S,
        verify: V,
    ) -> Self
    where
        S: Fn(&RawKey, &[u8]) -> Result<Vec<u8>, JoseError> + Send + Sync + 'static,
        V: Fn(&RawKey, &[u8], &[u8]) -> Result<(), JoseError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            family,
            hash,
            sign: Arc::new(sign),
            verify: Arc::new(verify),
        }
    }

    /// Create the built-in implementation of a [`JWA`] algorithm.
    pub fn from_jwa(alg: JWA) -> Self {
        let (id, family, hash) = (alg.as_str(), alg.family(), alg.hash());
        match alg {
            JWA::HS256 | JWA::HS384 | JWA::HS512 => {
                let hmac_alg = match hash {
                    HashFunction::Sha256 => hmac::HMAC_SHA256,
                    HashFunction::Sha384 => hmac::HMAC_SHA384,
                    HashFunction::Sha512 => hmac::HMAC_SHA512,
                };
                Self::new(
                    id,
                    family,
                    hash,
                    move |key, input| hmac_sign(hmac_alg, key, input),
                    move |key, input, sig| hmac_verify(hmac_alg, key, input, sig),
                )
            }
            JWA::RS256 | JWA::RS384 | JWA::RS512 | JWA::PS256 | JWA::PS384 | JWA::PS512 => {
                let (encoding, parameters) = rsa_scheme(alg);
                Self::new(
                    id,
                    family,
                    hash,
                    move |key, input| rsa_sign(encoding, key, input),
                    move |key, input, sig| rsa_verify(parameters, key, input, sig),
                )
            }
            JWA::ES256 | JWA::ES384 | JWA::ES512 => {
                Self::new(id, family, hash, ecdsa_sign, ecdsa_verify)
            }
        }
    }

    /// Identifier used as `alg` header value
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Family of key material required by this algorithm
    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Hash function of this algorithm
    pub fn hash(&self) -> HashFunction {
        self.hash
    }

    /// Fail with [`JoseError::KeyFamilyMismatch`] if the key is of another family.
    pub fn check_key(&self, key: &RawKey) -> Result<(), JoseError> {
        let found = key.family();
        if found == self.family {
            return Ok(());
        }
        Err(JoseError::KeyFamilyMismatch {
            alg: self.id.clone(),
            expected: self.family,
            found,
        })
    }

    /// Sign the input with the given key.
    pub fn sign(&self, key: &RawKey, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        self.check_key(key)?;
        (self.sign)(key, input)
    }

    /// Verify the signature over the input with the given key.
    pub fn verify(&self, key: &RawKey, input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        self.check_key(key)?;
        (self.verify)(key, input, signature)
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
/// Explicit lookup table of [`Algorithm`]s by identifier.
///
/// There is no process wide registry: a registry is constructed and handed
/// to the [`Signer`](crate::jose::Signer) and [`Verifier`](crate::jose::Verifier)
/// that need it. [`AlgorithmRegistry::default`] is empty,
/// [`AlgorithmRegistry::with_defaults`] holds every [`JWA`] algorithm.
pub struct AlgorithmRegistry {
    algorithms: HashMap<String, Arc<Algorithm>>,
}

impl AlgorithmRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in implementation of every [`JWA`] algorithm.
    pub fn with_defaults() -> Self {
        let algorithms = JWA::ALL
            .into_iter()
            .map(|alg| (alg.as_str().to_owned(), Arc::new(Algorithm::from_jwa(alg))))
            .collect();
        Self { algorithms }
    }

    /// Add an algorithm, failing if its identifier is taken.
    pub fn register(&mut self, algorithm: Algorithm) -> Result<(), JoseError> {
        if self.algorithms.contains_key(algorithm.id()) {
            return Err(JoseError::AlgorithmAlreadyRegistered {
                alg: algorithm.id,
            });
        }
        tracing::trace!(alg = algorithm.id(), family = %algorithm.family(), "register algorithm");
        self.algorithms
            .insert(algorithm.id.clone(), Arc::new(algorithm));
        Ok(())
    }

    /// Look up an algorithm by identifier.
    pub fn resolve(&self, id: &str) -> Result<Arc<Algorithm>, JoseError> {
        self.algorithms
            .get(id)
            .cloned()
            .ok_or_else(|| JoseError::UnknownAlgorithm { alg: id.to_owned() })
    }

    /// Whether an algorithm with this identifier is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.algorithms.contains_key(id)
    }

    /// Number of registered algorithms.
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Whether no algorithm is registered.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

fn hmac_sign(alg: hmac::Algorithm, key: &RawKey, input: &[u8]) -> Result<Vec<u8>, JoseError> {
    let RawKey::Symmetric(secret) = key else {
        return Err(unexpected_key());
    };
    let key = hmac::Key::new(alg, secret.as_bytes());
    Ok(hmac::sign(&key, input).as_ref().to_vec())
}

fn hmac_verify(
    alg: hmac::Algorithm,
    key: &RawKey,
    input: &[u8],
    signature: &[u8],
) -> Result<(), JoseError> {
    let RawKey::Symmetric(secret) = key else {
        return Err(unexpected_key());
    };
    let key = hmac::Key::new(alg, secret.as_bytes());
    hmac::verify(&key, input, signature).map_err(|_unspecified| JoseError::SignatureInvalid)
}

fn rsa_scheme(alg: JWA) -> (&'static dyn RsaEncoding, &'static RsaParameters) {
    match alg {
        JWA::RS384 => (&RSA_PKCS1_SHA384, &RSA_PKCS1_2048_8192_SHA384),
        JWA::RS512 => (&RSA_PKCS1_SHA512, &RSA_PKCS1_2048_8192_SHA512),
        JWA::PS256 => (&RSA_PSS_SHA256, &RSA_PSS_2048_8192_SHA256),
        JWA::PS384 => (&RSA_PSS_SHA384, &RSA_PSS_2048_8192_SHA384),
        JWA::PS512 => (&RSA_PSS_SHA512, &RSA_PSS_2048_8192_SHA512),
        _ => (&RSA_PKCS1_SHA256, &RSA_PKCS1_2048_8192_SHA256),
    }
}

fn rsa_sign(
    encoding: &'static dyn RsaEncoding,
    key: &RawKey,
    input: &[u8],
) -> Result<Vec<u8>, JoseError> {
    let RawKey::Rsa(rsa) = key else {
        return Err(unexpected_key());
    };
    let key_pair = rsa.key_pair().ok_or_else(no_private_key)?;
    let mut signature = vec![0; key_pair.public_modulus_len()];
    key_pair
        .sign(encoding, &SystemRandom::new(), input, &mut signature)
        .context("RSA sign")
        .map_err(JoseError::Signing)?;
    Ok(signature)
}

fn rsa_verify(
    parameters: &'static RsaParameters,
    key: &RawKey,
    input: &[u8],
    signature: &[u8],
) -> Result<(), JoseError> {
    let RawKey::Rsa(rsa) = key else {
        return Err(unexpected_key());
    };
    let public_key = RsaPublicKeyComponents {
        n: rsa.modulus(),
        e: rsa.exponent(),
    };
    public_key
        .verify(parameters, input, signature)
        .map_err(|_unspecified| JoseError::SignatureInvalid)
}

fn ecdsa_sign(key: &RawKey, input: &[u8]) -> Result<Vec<u8>, JoseError> {
    let RawKey::Ec(ec) = key else {
        return Err(unexpected_key());
    };
    let key_pair = ec.key_pair().ok_or_else(no_private_key)?;
    let signature = key_pair
        .sign(&SystemRandom::new(), input)
        .context("ECDSA sign")
        .map_err(JoseError::Signing)?;
    Ok(signature.as_ref().to_vec())
}

fn ecdsa_verify(key: &RawKey, input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
    let RawKey::Ec(ec) = key else {
        return Err(unexpected_key());
    };
    signature::UnparsedPublicKey::new(ec.curve().verification_algorithm(), ec.point())
        .verify(input, signature)
        .map_err(|_unspecified| JoseError::SignatureInvalid)
}

// Unreachable through `Algorithm::sign` / `Algorithm::verify`, which check the family first.
fn unexpected_key() -> JoseError {
    JoseError::Signing(OpaqueError::from_display(
        "key material does not match algorithm",
    ))
}

fn no_private_key() -> JoseError {
    JoseError::Signing(OpaqueError::from_display("key has no private material"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{JWKEllipticCurves, SymmetricKey};
    use tokio_test::assert_err;

    #[test]
    fn defaults_hold_every_jwa() {
        let registry = AlgorithmRegistry::with_defaults();
        assert_eq!(registry.len(), JWA::ALL.len());
        for alg in JWA::ALL {
            let algorithm = registry.resolve(alg.as_str()).unwrap();
            assert_eq!(algorithm.id(), alg.as_str());
            assert_eq!(algorithm.family(), alg.family());
        }
        assert!(AlgorithmRegistry::new().is_empty());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = AlgorithmRegistry::with_defaults();
        let err = registry
            .register(Algorithm::from_jwa(JWA::RS256))
            .unwrap_err();
        assert!(matches!(err, JoseError::AlgorithmAlreadyRegistered { alg } if alg == "RS256"));
    }

    #[test]
    fn unknown_algorithm() {
        let registry = AlgorithmRegistry::new();
        let err = registry.resolve("HS256").unwrap_err();
        assert!(matches!(err, JoseError::UnknownAlgorithm { alg } if alg == "HS256"));
    }

    #[test]
    fn registries_are_isolated() {
        let mut a = AlgorithmRegistry::new();
        let b = AlgorithmRegistry::new();
        a.register(Algorithm::new(
            "XOR",
            KeyFamily::Symmetric,
            HashFunction::Sha256,
            |_, input| Ok(input.iter().map(|b| b ^ 0xff).collect()),
            |_, input, sig| {
                if input.iter().map(|b| b ^ 0xff).eq(sig.iter().copied()) {
                    Ok(())
                } else {
                    Err(JoseError::SignatureInvalid)
                }
            },
        ))
        .unwrap();
        assert!(a.contains("XOR"));
        assert!(!b.contains("XOR"));

        let xor = a.resolve("XOR").unwrap();
        let key = RawKey::Symmetric(SymmetricKey::new(vec![0; 64]));
        let sig = xor.sign(&key, b"abc").unwrap();
        xor.verify(&key, b"abc", &sig).unwrap();
        assert_err!(xor.verify(&key, b"abd", &sig));

        let p256 = RawKey::generate(JWA::ES256, None).unwrap();
        let err = xor.sign(&p256, b"abc").unwrap_err();
        assert!(
            matches!(&err, JoseError::KeyFamilyMismatch { alg, expected: KeyFamily::Symmetric, .. } if alg == "XOR"),
            "{err}"
        );
    }

    #[test]
    fn wrong_family_is_rejected_before_signing() {
        let registry = AlgorithmRegistry::with_defaults();
        let es384 = registry.resolve("ES384").unwrap();
        let p256 = RawKey::generate(JWA::ES256, None).unwrap();
        let err = es384.sign(&p256, b"input").unwrap_err();
        assert!(matches!(
            &err,
            JoseError::KeyFamilyMismatch {
                alg,
                expected: KeyFamily::Ec(JWKEllipticCurves::P384),
                found: KeyFamily::Ec(JWKEllipticCurves::P256),
            } if alg == "ES384"
        ));
    }

    #[test]
    fn every_default_algorithm_signs_and_verifies() {
        let registry = AlgorithmRegistry::with_defaults();
        for alg in JWA::ALL {
            let key = RawKey::generate(alg, None).unwrap();
            let algorithm = registry.resolve(alg.as_str()).unwrap();
            let signature = algorithm.sign(&key, b"header.claims").unwrap();
            algorithm
                .verify(&key, b"header.claims", &signature)
                .unwrap_or_else(|err| panic!("{alg}: {err}"));
            assert!(matches!(
                algorithm.verify(&key, b"header.claimz", &signature),
                Err(JoseError::SignatureInvalid)
            ));
        }
    }

    #[test]
    fn ecdsa_signatures_are_fixed_width() {
        let registry = AlgorithmRegistry::with_defaults();
        for (alg, len) in [(JWA::ES256, 64), (JWA::ES384, 96), (JWA::ES512, 132)] {
            let key = RawKey::generate(alg, None).unwrap();
            let signature = registry
                .resolve(alg.as_str())
                .unwrap()
                .sign(&key, b"input")
                .unwrap();
            assert_eq!(signature.len(), len, "{alg}");
        }
    }
}
