use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use tessera_utils::macros::generate_set_and_with;
use tracing::debug;

use crate::jose::{
    Algorithm, AlgorithmRegistry, Audience, Claims, Header, JoseError, KeyStore, NumericDate,
    RawKey, jws::sign_compact,
};

const DEFAULT_LIFETIME: SignedDuration = SignedDuration::from_mins(10);

fn default_lifetime() -> SignedDuration {
    DEFAULT_LIFETIME
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Configuration of a [`Signer`].
///
/// The `lifetime` accepts friendly (`"10s"`, `"1h 30m"`) as well as
/// ISO 8601 (`"PT10S"`) durations and defaults to 10 minutes.
pub struct SignerConfig {
    issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_set_url: Option<String>,
    sign_key_id: String,
    #[serde(default = "default_lifetime")]
    lifetime: SignedDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audience: Option<String>,
}

impl SignerConfig {
    /// Create a [`SignerConfig`] issuing tokens as `issuer`, signed with the
    /// key identified by `sign_key_id`.
    pub fn new(issuer: impl Into<String>, sign_key_id: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            key_set_url: None,
            sign_key_id: sign_key_id.into(),
            lifetime: DEFAULT_LIFETIME,
            audience: None,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn key_set_url(&self) -> Option<&str> {
        self.key_set_url.as_deref()
    }

    pub fn sign_key_id(&self) -> &str {
        &self.sign_key_id
    }

    pub fn lifetime(&self) -> SignedDuration {
        self.lifetime
    }

    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    generate_set_and_with! {
        /// Set the issuer stamped onto every token
        pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
            self.issuer = issuer.into();
            self
        }
    }

    generate_set_and_with! {
        /// Set (or clear) the URL of the published key set, advertised as `jku`
        pub fn key_set_url(mut self, url: Option<String>) -> Self {
            self.key_set_url = url;
            self
        }
    }

    generate_set_and_with! {
        /// Set the identifier of the signing key
        pub fn sign_key_id(mut self, kid: impl Into<String>) -> Self {
            self.sign_key_id = kid.into();
            self
        }
    }

    generate_set_and_with! {
        /// Set the time between issuance and expiration of a token
        pub fn lifetime(mut self, lifetime: SignedDuration) -> Self {
            self.lifetime = lifetime;
            self
        }
    }

    generate_set_and_with! {
        /// Set (or clear) the audience stamped onto tokens which carry none
        pub fn audience(mut self, audience: Option<String>) -> Self {
            self.audience = audience;
            self
        }
    }
}

#[derive(Debug, Clone)]
/// Mints signed tokens with a single key.
///
/// All fallible key work happens in [`Signer::new`]: the signing key is
/// fetched, parsed and checked against its algorithm once, after which
/// a [`Signer`] is immutable and can be shared between threads.
pub struct Signer {
    config: SignerConfig,
    key: RawKey,
    algorithm: Arc<Algorithm>,
    header: Header,
}

impl Signer {
    /// Create a [`Signer`] using the key `config.sign_key_id()` of the given store.
    pub fn new<S: KeyStore>(
        store: &S,
        config: SignerConfig,
        registry: &AlgorithmRegistry,
    ) -> Result<Self, JoseError> {
        let key = store
            .key(config.sign_key_id())
            .map_err(JoseError::from_key_store)?;
        let algorithm = registry.resolve(key.alg().as_str())?;
        let material = key.material()?.clone();
        algorithm.check_key(&material)?;

        if !key.usage().can_sign() || !material.can_sign() {
            return Err(JoseError::MissingPrivateKey {
                kid: key.kid().to_owned(),
            });
        }

        let header = Header::jwt(algorithm.id(), key.kid())
            .maybe_with_jku(config.key_set_url().map(ToOwned::to_owned));

        debug!(
            kid = key.kid(),
            alg = algorithm.id(),
            issuer = config.issuer(),
            lifetime = %config.lifetime(),
            "signer ready"
        );

        Ok(Self {
            config,
            key: material,
            algorithm,
            header,
        })
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Header of every token minted by this signer
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mint a token for the given claims, issued now.
    ///
    /// See [`Signer::create_at`].
    pub fn create(&self, claims: Claims) -> Result<String, JoseError> {
        self.create_at(claims, Timestamp::now())
    }

    /// Mint a token for the given claims, issued at `now`.
    ///
    /// `iss`, `iat`, `nbf` and `exp` are always overwritten: `iss` with the
    /// configured issuer, `iat` and `nbf` with `now`, `exp` with `now` plus the
    /// configured lifetime. The configured audience is only set on claims
    /// that carry none.
    pub fn create_at(&self, mut claims: Claims, now: Timestamp) -> Result<String, JoseError> {
        let issued_at = NumericDate::from_timestamp(now);
        claims.iss = Some(self.config.issuer.clone());
        claims.iat = Some(issued_at);
        claims.nbf = Some(issued_at);
        claims.exp = Some(issued_at.saturating_add(self.config.lifetime));
        if claims.aud.is_none() {
            claims.aud = self.config.audience.as_deref().map(Audience::new);
        }

        sign_compact(&self.header, &claims, &self.key, &self.algorithm)
    }
}
