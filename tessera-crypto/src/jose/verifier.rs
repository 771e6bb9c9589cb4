use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use jiff::{SignedDuration, Timestamp};
use tracing::{debug, info, trace};

use crate::jose::{
    Algorithm, AlgorithmRegistry, Claims, JoseError, Key, KeySet, KeyStore, RawKey, SignedToken,
    Validation, jws::decode_and_verify_with,
};

#[derive(Debug, Clone)]
struct CachedKey {
    key: Key,
    material: RawKey,
    algorithm: Arc<Algorithm>,
}

#[derive(Debug, Clone)]
/// Verifies tokens against a published key set and validates their claims.
///
/// The key set is fetched and every key parsed once, in [`Verifier::new`].
/// A single unusable key fails the construction. Afterwards a [`Verifier`]
/// is immutable: refreshing the key set means building a new one, see
/// [`VerifierHandle`].
pub struct Verifier {
    keys: HashMap<String, CachedKey>,
    validation: Validation,
}

impl Verifier {
    /// Create a [`Verifier`] over every key of the provider, expecting
    /// tokens issued by `issuer`.
    pub fn new<P: KeyStore>(
        provider: &P,
        issuer: impl Into<String>,
        registry: &AlgorithmRegistry,
    ) -> Result<Self, JoseError> {
        Self::with_validation(provider, Validation::new(issuer), registry)
    }

    /// Create a [`Verifier`] over every key of the provider with the
    /// given claims [`Validation`].
    pub fn with_validation<P: KeyStore>(
        provider: &P,
        validation: Validation,
        registry: &AlgorithmRegistry,
    ) -> Result<Self, JoseError> {
        let keys = provider.keys().map_err(JoseError::from_key_store)?;
        Self::from_key_set(&keys, validation, registry)
    }

    /// Create a [`Verifier`] over an already fetched [`KeySet`].
    pub fn from_key_set(
        keys: &KeySet,
        validation: Validation,
        registry: &AlgorithmRegistry,
    ) -> Result<Self, JoseError> {
        let mut cache = HashMap::with_capacity(keys.len());
        for key in keys {
            let cached = load_key(key, registry)
                .inspect_err(|err| debug!(kid = key.kid(), %err, "failed to load key"))?;
            if !key.usage().can_verify() {
                debug!(kid = key.kid(), "skip key not meant for verification");
                continue;
            }

            debug!(kid = key.kid(), alg = cached.algorithm.id(), "key loaded");
            cache.insert(key.kid().to_owned(), cached);
        }

        info!(
            keys = cache.len(),
            issuer = validation.issuer(),
            "verifier key set loaded"
        );

        Ok(Self {
            keys: cache,
            validation,
        })
    }

    /// Claims validation options
    pub fn validation(&self) -> &Validation {
        &self.validation
    }

    /// Identifiers of the keys tokens can be verified with
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Key used to verify tokens with the given identifier
    pub fn key(&self, kid: &str) -> Option<&Key> {
        self.keys.get(kid).map(|cached| &cached.key)
    }

    #[must_use]
    /// Tolerate the given clock skew when validating claims.
    pub fn with_leeway(mut self, leeway: SignedDuration) -> Self {
        self.validation.set_leeway(leeway);
        self
    }

    /// Verify a token and validate its claims against the current time.
    ///
    /// See [`Verifier::verify_at`].
    pub fn verify(&self, token: &str) -> Result<SignedToken, JoseError> {
        self.verify_at(token, Timestamp::now())
    }

    /// Verify a token and validate its claims against the given time.
    ///
    /// The key is selected by the `kid` of the token header, and the `alg`
    /// it declares must be the algorithm of that key. Claims validation
    /// failures are returned as [`JoseError::InvalidToken`].
    pub fn verify_at(&self, token: &str, now: Timestamp) -> Result<SignedToken, JoseError> {
        let result = decode_and_verify_with(token, |header| {
            let cached = self
                .keys
                .get(header.kid())
                .ok_or_else(|| JoseError::UnknownKeyId {
                    kid: header.kid().to_owned(),
                })?;

            let expected = cached.key.alg();
            if header.alg() != expected.as_str() {
                return Err(JoseError::AlgorithmMismatch {
                    expected,
                    found: header.alg().to_owned(),
                });
            }

            Ok((&cached.material, cached.algorithm.clone()))
        })
        .and_then(|token: SignedToken| {
            self.validation
                .validate_at(token.claims(), now)
                .map_err(|err| JoseError::InvalidToken(Box::new(err)))?;
            Ok(token)
        });

        match &result {
            Ok(token) => trace!(kid = token.header().kid(), "token accepted"),
            Err(err) => debug!(%err, cause = %err.validation_cause(), "token rejected"),
        }
        result
    }

    /// Whether the claims grant the required scopes.
    ///
    /// Each required list is satisfied when it is empty, or when the
    /// matching scope claim shares at least one scope with it. A required
    /// list with an absent scope claim is not satisfied.
    pub fn verify_scopes<C, U>(claims: &Claims, client: &[C], user: &[U]) -> bool
    where
        C: AsRef<str>,
        U: AsRef<str>,
    {
        scopes_granted(claims.client_scopes(), client) && scopes_granted(claims.user_scopes(), user)
    }
}

fn load_key(key: &Key, registry: &AlgorithmRegistry) -> Result<CachedKey, JoseError> {
    let algorithm = registry.resolve(key.alg().as_str())?;
    let material = key.material()?.clone();
    algorithm.check_key(&material)?;
    Ok(CachedKey {
        key: key.clone(),
        material,
        algorithm,
    })
}

fn scopes_granted<S: AsRef<str>>(granted: Option<&[String]>, required: &[S]) -> bool {
    if required.is_empty() {
        return true;
    }
    granted.is_some_and(|granted| {
        required
            .iter()
            .any(|scope| granted.iter().any(|g| g == scope.as_ref()))
    })
}

#[derive(Debug)]
/// Shared handle to the current [`Verifier`] of a process.
///
/// Verification loads the current instance without locking. Rotating the
/// key set builds a complete new [`Verifier`] and swaps it in atomically:
/// in-flight verifications finish on the instance they started with.
pub struct VerifierHandle {
    current: ArcSwap<Verifier>,
}

impl VerifierHandle {
    pub fn new(verifier: Verifier) -> Self {
        Self {
            current: ArcSwap::from_pointee(verifier),
        }
    }

    /// The current [`Verifier`]
    pub fn current(&self) -> Arc<Verifier> {
        self.current.load_full()
    }

    /// Verify a token with the current [`Verifier`].
    pub fn verify(&self, token: &str) -> Result<SignedToken, JoseError> {
        self.current.load().verify(token)
    }

    /// Verify a token with the current [`Verifier`] at the given time.
    pub fn verify_at(&self, token: &str, now: Timestamp) -> Result<SignedToken, JoseError> {
        self.current.load().verify_at(token, now)
    }

    /// Install a new [`Verifier`], returning the previous one.
    pub fn swap(&self, verifier: Verifier) -> Arc<Verifier> {
        let keys = verifier.keys.len();
        let previous = self.current.swap(Arc::new(verifier));
        info!(keys, previous_keys = previous.keys.len(), "verifier swapped");
        previous
    }

    /// Build a new [`Verifier`] from the provider, keeping the current
    /// claims validation, and swap it in.
    ///
    /// On failure the current [`Verifier`] stays in place.
    pub fn reload<P: KeyStore>(
        &self,
        provider: &P,
        registry: &AlgorithmRegistry,
    ) -> Result<Arc<Verifier>, JoseError> {
        let validation = self.current.load().validation().clone();
        let next = Verifier::with_validation(provider, validation, registry)?;
        Ok(self.swap(next))
    }
}

impl From<Verifier> for VerifierHandle {
    fn from(verifier: Verifier) -> Self {
        Self::new(verifier)
    }
}
