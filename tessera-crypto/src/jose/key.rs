use std::{slice, sync::Arc, sync::OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
use tessera_error::BoxError;
use tessera_utils::macros::generate_set_and_with;

use crate::jose::{JWA, JWK, JWKKeyOperation, JWKType, JoseError, RawKey, parse_pem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// What a [`Key`] may be used for.
pub enum KeyUsage {
    Sign,
    Verify,
    SignAndVerify,
}

impl KeyUsage {
    /// Whether tokens may be signed with the key.
    pub fn can_sign(self) -> bool {
        matches!(self, Self::Sign | Self::SignAndVerify)
    }

    /// Whether tokens may be verified with the key.
    pub fn can_verify(self) -> bool {
        matches!(self, Self::Verify | Self::SignAndVerify)
    }
}

#[derive(Debug, Clone)]
/// A key of a [`KeySet`]: its [`JWK`] description and the key material
/// parsed from it.
///
/// Keys created from a PEM document or generated in process hold their
/// private material. Keys read from a published key set only hold public
/// material, which is parsed on first use.
///
/// Serializing a [`Key`] only ever writes its public [`JWK`]; symmetric
/// keys refuse to be serialized.
pub struct Key {
    jwk: JWK,
    material: OnceLock<RawKey>,
}

impl Key {
    /// Create a [`Key`] from its [`JWK`], the key material is parsed lazily.
    pub fn from_jwk(jwk: JWK) -> Self {
        Self {
            jwk,
            material: OnceLock::new(),
        }
    }

    /// Create a [`Key`] for the given algorithm from already parsed key material.
    pub fn from_raw(kid: impl Into<String>, alg: JWA, material: RawKey) -> Result<Self, JoseError> {
        let jwk = JWK::from_raw_key(kid, alg, &material)?;
        Ok(Self {
            jwk,
            material: OnceLock::from(material),
        })
    }

    /// Create a [`Key`] for the given algorithm from a PEM document.
    ///
    /// See [`KeyParser`](crate::jose::KeyParser) for the accepted encodings.
    pub fn from_pem(
        kid: impl Into<String>,
        alg: JWA,
        pem: impl AsRef<[u8]>,
    ) -> Result<Self, JoseError> {
        Self::from_raw(kid, alg, parse_pem(pem)?)
    }

    /// Generate a [`Key`] for the given algorithm.
    ///
    /// `bits` is interpreted as in [`RawKey::generate`]. The key identifier
    /// is the [`JWK::thumbprint`] of the new key.
    pub fn generate(alg: JWA, bits: Option<usize>) -> Result<Self, JoseError> {
        let material = RawKey::generate(alg, bits)?;
        let mut key = Self::from_raw("", alg, material)?;
        let kid = key.jwk.thumbprint()?;
        key.jwk.set_kid(kid);
        Ok(key)
    }

    /// Key identifier
    pub fn kid(&self) -> &str {
        self.jwk.kid()
    }

    /// Algorithm this key is used with
    pub fn alg(&self) -> JWA {
        self.jwk.alg()
    }

    /// The [`JWK`] describing this key
    pub fn jwk(&self) -> &JWK {
        &self.jwk
    }

    /// The parsed key material, parsed from the [`JWK`] on first use.
    pub fn material(&self) -> Result<&RawKey, JoseError> {
        if let Some(material) = self.material.get() {
            return Ok(material);
        }
        let material = self.jwk.to_raw_key()?;
        Ok(self.material.get_or_init(|| material))
    }

    /// What this key may be used for.
    ///
    /// Derived from the `key_ops` member when it names signing or verification,
    /// otherwise from the presence of private material.
    pub fn usage(&self) -> KeyUsage {
        if let Some(ops) = self.jwk.key_ops() {
            let sign = ops.contains(&JWKKeyOperation::Sign);
            let verify = ops.contains(&JWKKeyOperation::Verify);
            match (sign, verify) {
                (true, true) => return KeyUsage::SignAndVerify,
                (true, false) => return KeyUsage::Sign,
                (false, true) => return KeyUsage::Verify,
                (false, false) => (),
            }
        }

        if self.material().is_ok_and(RawKey::can_sign) {
            KeyUsage::SignAndVerify
        } else {
            KeyUsage::Verify
        }
    }

    generate_set_and_with! {
        /// Set the key identifier
        pub fn kid(mut self, kid: impl Into<String>) -> Self {
            self.jwk.set_kid(kid);
            self
        }
    }

    generate_set_and_with! {
        /// Set (or clear) the permitted key operations
        pub fn key_ops(mut self, key_ops: Option<Vec<JWKKeyOperation>>) -> Self {
            self.jwk.maybe_set_key_ops(key_ops);
            self
        }
    }

    fn is_symmetric(&self) -> bool {
        matches!(self.jwk.key_type(), JWKType::OCT { .. })
    }
}

impl From<JWK> for Key {
    fn from(jwk: JWK) -> Self {
        Self::from_jwk(jwk)
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_symmetric() {
            return Err(ser::Error::custom(format!(
                "symmetric key '{}' cannot be published",
                self.kid()
            )));
        }
        self.jwk.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        JWK::deserialize(deserializer).map(Self::from_jwk)
    }
}

#[derive(Debug, Clone, Default)]
/// An ordered collection of [`Key`]s with unique identifiers.
///
/// Serialized as a JWK Set document (`{"keys": [...]}`), in which
/// symmetric keys are left out.
pub struct KeySet {
    keys: Vec<Key>,
}

impl KeySet {
    /// Create an empty [`KeySet`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key, failing if its identifier is already taken.
    pub fn push(&mut self, key: Key) -> Result<(), JoseError> {
        if self.keys.iter().any(|k| k.kid() == key.kid()) {
            return Err(JoseError::DuplicateKeyId {
                kid: key.kid().to_owned(),
            });
        }
        self.keys.push(key);
        Ok(())
    }

    /// [`Self::push`] in builder style.
    pub fn with_key(mut self, key: Key) -> Result<Self, JoseError> {
        self.push(key)?;
        Ok(self)
    }

    /// Look up a key by its identifier.
    pub fn by_id(&self, kid: &str) -> Result<&Key, JoseError> {
        self.keys
            .iter()
            .find(|key| key.kid() == kid)
            .ok_or_else(|| JoseError::UnknownKeyId {
                kid: kid.to_owned(),
            })
    }

    pub fn iter(&self) -> slice::Iter<'_, Key> {
        self.keys.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(Key::kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Key;
    type IntoIter = slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Vec<Key>> for KeySet {
    type Error = JoseError;

    fn try_from(keys: Vec<Key>) -> Result<Self, Self::Error> {
        keys.into_iter().try_fold(Self::new(), Self::with_key)
    }
}

impl Serialize for KeySet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Document<'a> {
            keys: Vec<&'a Key>,
        }

        Document {
            keys: self.keys.iter().filter(|key| !key.is_symmetric()).collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeySet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Document {
            keys: Vec<Key>,
        }

        let document = Document::deserialize(deserializer)?;
        Self::try_from(document.keys).map_err(de::Error::custom)
    }
}

/// Source of [`Key`]s for a [`Signer`](crate::jose::Signer) or a
/// [`Verifier`](crate::jose::Verifier).
///
/// Implementations may be backed by memory, a database or a remote key set
/// document. Both methods are only called while constructing a signer or a
/// verifier.
pub trait KeyStore {
    type Error: Into<BoxError>;

    /// Fetch a single key by its identifier.
    fn key(&self, kid: &str) -> Result<Key, Self::Error>;

    /// Fetch every published key.
    fn keys(&self) -> Result<KeySet, Self::Error>;
}

impl KeyStore for KeySet {
    type Error = JoseError;

    fn key(&self, kid: &str) -> Result<Key, Self::Error> {
        self.by_id(kid).cloned()
    }

    fn keys(&self) -> Result<KeySet, Self::Error> {
        Ok(self.clone())
    }
}

impl<S: KeyStore> KeyStore for Arc<S> {
    type Error = S::Error;

    fn key(&self, kid: &str) -> Result<Key, Self::Error> {
        (**self).key(kid)
    }

    fn keys(&self) -> Result<KeySet, Self::Error> {
        (**self).keys()
    }
}

impl<S: KeyStore> KeyStore for &S {
    type Error = S::Error;

    fn key(&self, kid: &str) -> Result<Key, Self::Error> {
        (**self).key(kid)
    }

    fn keys(&self) -> Result<KeySet, Self::Error> {
        (**self).keys()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::jose::{JWKEllipticCurves, KeyFamily};

    const RSA_PKCS1: &str = include_str!("../../testdata/rsa_pkcs1.pem");
    const EC_P256_PKCS8: &str = include_str!("../../testdata/ec_p256_pkcs8.pem");
    const EC_P256_PUBLIC: &str = include_str!("../../testdata/ec_p256_public.pem");

    #[test]
    fn key_from_pem_keeps_private_material() {
        let key = Key::from_pem("rsa", JWA::RS256, RSA_PKCS1).unwrap();
        assert_eq!(key.kid(), "rsa");
        assert_eq!(key.alg(), JWA::RS256);
        assert!(key.material().unwrap().can_sign());
        assert_eq!(key.usage(), KeyUsage::SignAndVerify);

        let key = Key::from_pem("ec", JWA::ES256, EC_P256_PUBLIC).unwrap();
        assert!(!key.material().unwrap().can_sign());
        assert_eq!(key.usage(), KeyUsage::Verify);
    }

    #[test]
    fn key_from_pem_checks_family() {
        let err = assert_err!(Key::from_pem("ec", JWA::ES384, EC_P256_PKCS8));
        assert!(
            matches!(
                err,
                JoseError::KeyFamilyMismatch {
                    found: KeyFamily::Ec(JWKEllipticCurves::P256),
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn key_ops_take_precedence_for_usage() {
        let key = Key::from_pem("ec", JWA::ES256, EC_P256_PKCS8)
            .unwrap()
            .with_key_ops(vec![JWKKeyOperation::Verify]);
        assert_eq!(key.usage(), KeyUsage::Verify);
        assert!(!key.usage().can_sign());

        let key = key.with_key_ops(vec![JWKKeyOperation::Sign]);
        assert_eq!(key.usage(), KeyUsage::Sign);

        let key = key.with_key_ops(vec![JWKKeyOperation::Encrypt]);
        assert_eq!(key.usage(), KeyUsage::SignAndVerify);
    }

    #[test]
    fn generated_key_is_identified_by_its_thumbprint() {
        let key = Key::generate(JWA::ES256, None).unwrap();
        assert_eq!(key.kid(), key.jwk().thumbprint().unwrap());
        assert!(key.material().unwrap().can_sign());
    }

    #[test]
    fn serialized_key_only_holds_public_material() {
        let key = Key::from_pem("rsa", JWA::RS256, RSA_PKCS1).unwrap();
        let value = serde_json::to_value(&key).unwrap();
        assert_eq!(value["kid"], "rsa");
        assert_eq!(value["kty"], "RSA");
        assert_eq!(value["alg"], "RS256");
        for private in ["d", "p", "q", "dp", "dq", "qi"] {
            assert!(value.get(private).is_none(), "{private} leaked");
        }

        let parsed: Key = serde_json::from_value(value).unwrap();
        assert!(!parsed.material().unwrap().can_sign());
        assert_eq!(parsed.jwk(), key.jwk());
    }

    #[test]
    fn symmetric_keys_are_never_published() {
        let secret = Key::generate(JWA::HS256, None).unwrap();
        assert_err!(serde_json::to_value(&secret));

        let ec = Key::generate(JWA::ES256, None).unwrap();
        let set = KeySet::new()
            .with_key(secret)
            .unwrap()
            .with_key(ec.clone())
            .unwrap();
        assert_eq!(set.len(), 2);

        let value = serde_json::to_value(&set).unwrap();
        let keys = value["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["kid"], Value::String(ec.kid().to_owned()));
    }

    #[test]
    fn key_material_is_parsed_lazily() {
        let document = r#"{"keys": [
            {"kid": "good", "alg": "ES256", "kty": "EC", "crv": "P-256",
             "x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
             "y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0"},
            {"kid": "broken", "alg": "RS256", "kty": "RSA", "n": "!!!", "e": "AQAB"}
        ]}"#;
        let set: KeySet = serde_json::from_str(document).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), ["good", "broken"]);

        assert_ok!(set.by_id("good").unwrap().material());
        let err = assert_err!(set.by_id("broken").unwrap().material());
        assert!(matches!(err, JoseError::UnparsableKey(_)), "{err}");
    }

    #[test]
    fn key_set_lookup_and_uniqueness() {
        let key = Key::generate(JWA::ES256, None).unwrap();
        let mut set = KeySet::new();
        set.push(key.clone()).unwrap();

        let err = assert_err!(set.push(key.clone()));
        assert!(matches!(err, JoseError::DuplicateKeyId { .. }), "{err}");

        assert_eq!(set.by_id(key.kid()).unwrap().kid(), key.kid());
        let err = assert_err!(set.by_id("missing"));
        assert!(matches!(err, JoseError::UnknownKeyId { kid } if kid == "missing"));
    }

    #[test]
    fn key_set_document_rejects_duplicate_ids() {
        let document = r#"{"keys": [
            {"kid": "a", "alg": "HS256", "kty": "oct", "k": "c2VjcmV0"},
            {"kid": "a", "alg": "HS256", "kty": "oct", "k": "c2VjcmV0"}
        ]}"#;
        assert_err!(serde_json::from_str::<KeySet>(document));
    }

    #[test]
    fn key_set_is_a_key_store() {
        let key = Key::generate(JWA::ES256, None).unwrap();
        let set = Arc::new(KeySet::new().with_key(key.clone()).unwrap());

        let found = assert_ok!(set.key(key.kid()));
        assert_eq!(found.jwk(), key.jwk());
        assert_err!(set.key("missing"));
        assert_eq!(assert_ok!(set.keys()).len(), 1);
    }
}
