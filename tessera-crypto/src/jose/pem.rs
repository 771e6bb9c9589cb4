//! PEM decoding of key material.
//!
//! A PEM block does not reliably tell which encoding it wraps, so a
//! [`KeyParser`] tries an ordered list of [`KeyParseStrategy`]s on the
//! decoded DER and keeps the first success. The default order is:
//!
//! 1. [`Pkcs1PrivateKey`]
//! 2. [`Pkcs8PrivateKey`]
//! 3. [`PkixPublicKey`]
//! 4. [`X509Certificate`]
//!
//! Private key encodings come first since a private key never parses as a certificate.

use std::{fmt, io::Cursor};

use aws_lc_rs::signature::{EcdsaKeyPair, RsaKeyPair};
use base64::{Engine as _, prelude::BASE64_STANDARD};
use tessera_error::{ErrorContext, OpaqueError};
use x509_parser::{
    pem::Pem,
    prelude::FromDer,
    public_key::PublicKey,
    x509::SubjectPublicKeyInfo,
};

use crate::jose::{EcKey, JWKEllipticCurves, JoseError, RawKey, RsaKey};

/// One way of turning DER bytes into [`RawKey`] material.
pub trait KeyParseStrategy: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Try to parse the DER bytes.
    fn parse(&self, der: &[u8]) -> Result<RawKey, OpaqueError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// RSA private key in PKCS#1 form (`RSA PRIVATE KEY`).
pub struct Pkcs1PrivateKey;

impl KeyParseStrategy for Pkcs1PrivateKey {
    fn name(&self) -> &'static str {
        "pkcs1-private-key"
    }

    fn parse(&self, der: &[u8]) -> Result<RawKey, OpaqueError> {
        let key_pair = RsaKeyPair::from_der(der).context("parse PKCS#1 RSA private key")?;
        Ok(RawKey::Rsa(RsaKey::from_key_pair(key_pair)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// RSA or EC (P-256, P-384, P-521) private key in PKCS#8 form (`PRIVATE KEY`).
pub struct Pkcs8PrivateKey;

impl KeyParseStrategy for Pkcs8PrivateKey {
    fn name(&self) -> &'static str {
        "pkcs8-private-key"
    }

    fn parse(&self, der: &[u8]) -> Result<RawKey, OpaqueError> {
        if let Ok(key_pair) = RsaKeyPair::from_pkcs8(der) {
            return Ok(RawKey::Rsa(RsaKey::from_key_pair(key_pair)));
        }

        for curve in [
            JWKEllipticCurves::P256,
            JWKEllipticCurves::P384,
            JWKEllipticCurves::P521,
        ] {
            if let Ok(key_pair) = EcdsaKeyPair::from_pkcs8(curve.signing_algorithm(), der) {
                return Ok(RawKey::Ec(EcKey::from_key_pair(curve, key_pair)));
            }
        }

        Err(OpaqueError::from_display(
            "not a PKCS#8 RSA or EC (P-256, P-384, P-521) private key",
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Public key in PKIX SubjectPublicKeyInfo form (`PUBLIC KEY`).
pub struct PkixPublicKey;

impl KeyParseStrategy for PkixPublicKey {
    fn name(&self) -> &'static str {
        "pkix-public-key"
    }

    fn parse(&self, der: &[u8]) -> Result<RawKey, OpaqueError> {
        let (_, spki) =
            SubjectPublicKeyInfo::from_der(der).context("parse SubjectPublicKeyInfo")?;
        raw_key_from_spki(&spki)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// X.509 certificate (`CERTIFICATE`), yielding only its public key.
pub struct X509Certificate;

impl KeyParseStrategy for X509Certificate {
    fn name(&self) -> &'static str {
        "x509-certificate"
    }

    fn parse(&self, der: &[u8]) -> Result<RawKey, OpaqueError> {
        let (_, cert) =
            x509_parser::parse_x509_certificate(der).context("parse X.509 certificate")?;
        raw_key_from_spki(cert.public_key())
    }
}

fn raw_key_from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<RawKey, OpaqueError> {
    match spki.parsed().context("decode subject public key")? {
        PublicKey::RSA(rsa) => RsaKey::from_public_components(rsa.modulus, rsa.exponent)
            .map(RawKey::Rsa)
            .map_err(OpaqueError::from_std),
        PublicKey::EC(point) => {
            let point = point.data();
            let curve = JWKEllipticCurves::from_point_len(point.len()).context(
                "EC public key is not an uncompressed P-256, P-384 or P-521 point",
            )?;
            EcKey::from_public_point(curve, point.to_vec())
                .map(RawKey::Ec)
                .map_err(OpaqueError::from_std)
        }
        _ => Err(OpaqueError::from_display(
            "unsupported public key algorithm",
        )),
    }
}

/// Ordered list of [`KeyParseStrategy`]s, first success wins.
pub struct KeyParser {
    strategies: Vec<Box<dyn KeyParseStrategy>>,
}

impl KeyParser {
    /// Create a [`KeyParser`] with the default strategy order.
    pub fn new() -> Self {
        Self::empty()
            .with_strategy(Pkcs1PrivateKey)
            .with_strategy(Pkcs8PrivateKey)
            .with_strategy(PkixPublicKey)
            .with_strategy(X509Certificate)
    }

    /// Create a [`KeyParser`] without any strategy.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    #[must_use]
    /// Append a strategy, tried after all strategies added before it.
    pub fn with_strategy(mut self, strategy: impl KeyParseStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Names of the strategies in the order they are tried.
    pub fn strategies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.iter().map(|strategy| strategy.name())
    }

    /// Decode the first PEM block of the input and parse its content.
    ///
    /// Text before the block is skipped.
    pub fn parse_pem(&self, pem: impl AsRef<[u8]>) -> Result<RawKey, JoseError> {
        let (pem, _) = Pem::read(Cursor::new(pem.as_ref()))
            .context("read PEM block")
            .map_err(JoseError::NotPemEncoded)?;
        tracing::trace!(label = %pem.label, "decoded PEM block");
        self.parse_der(&pem.contents)
    }

    /// Parse DER bytes, trying each strategy in order.
    pub fn parse_der(&self, der: &[u8]) -> Result<RawKey, JoseError> {
        for strategy in &self.strategies {
            match strategy.parse(der) {
                Ok(key) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        family = %key.family(),
                        "parsed key material"
                    );
                    return Ok(key);
                }
                Err(err) => {
                    tracing::trace!(strategy = strategy.name(), %err, "key parse strategy rejected input");
                }
            }
        }
        Err(JoseError::UnparsableKey(OpaqueError::from_display(
            "no key parse strategy accepted the input",
        )))
    }
}

impl Default for KeyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.strategies()).finish()
    }
}

/// Parse PEM encoded key material with the default [`KeyParser`].
pub fn parse_pem(pem: impl AsRef<[u8]>) -> Result<RawKey, JoseError> {
    KeyParser::new().parse_pem(pem)
}

/// Wrap DER bytes in a PEM envelope with the given label.
pub(crate) fn encode_pem(label: &str, der: &[u8]) -> String {
    let encoded = BASE64_STANDARD.encode(der);
    let mut pem = String::with_capacity(encoded.len() + encoded.len() / 64 + 2 * label.len() + 40);
    pem.push_str("-----BEGIN ");
    pem.push_str(label);
    pem.push_str("-----\n");
    for line in encoded.as_bytes().chunks(64) {
        // base64 output is ascii
        pem.extend(line.iter().map(|b| char::from(*b)));
        pem.push('\n');
    }
    pem.push_str("-----END ");
    pem.push_str(label);
    pem.push_str("-----\n");
    pem
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::jose::{JWA, KeyFamily};

    const RSA_PKCS1: &str = include_str!("../../testdata/rsa_pkcs1.pem");
    const RSA_CERT: &str = include_str!("../../testdata/rsa_cert.pem");

    struct Counting<S> {
        inner: S,
        calls: Arc<AtomicUsize>,
    }

    impl<S: KeyParseStrategy> KeyParseStrategy for Counting<S> {
        fn name(&self) -> &'static str {
            self.inner.name()
        }

        fn parse(&self, der: &[u8]) -> Result<RawKey, OpaqueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.parse(der)
        }
    }

    fn counting_parser() -> (KeyParser, [Arc<AtomicUsize>; 4]) {
        let counters: [Arc<AtomicUsize>; 4] = Default::default();
        let parser = KeyParser::empty()
            .with_strategy(Counting {
                inner: Pkcs1PrivateKey,
                calls: counters[0].clone(),
            })
            .with_strategy(Counting {
                inner: Pkcs8PrivateKey,
                calls: counters[1].clone(),
            })
            .with_strategy(Counting {
                inner: PkixPublicKey,
                calls: counters[2].clone(),
            })
            .with_strategy(Counting {
                inner: X509Certificate,
                calls: counters[3].clone(),
            });
        (parser, counters)
    }

    fn calls(counters: &[Arc<AtomicUsize>; 4]) -> [usize; 4] {
        counters.each_ref().map(|c| c.load(Ordering::SeqCst))
    }

    #[test]
    fn default_order() {
        let names: Vec<_> = KeyParser::default().strategies().collect();
        assert_eq!(
            names,
            [
                "pkcs1-private-key",
                "pkcs8-private-key",
                "pkix-public-key",
                "x509-certificate"
            ]
        );
    }

    #[test]
    fn pkcs1_stops_at_first_strategy() {
        let (parser, counters) = counting_parser();
        let key = parser.parse_pem(RSA_PKCS1).unwrap();
        assert_eq!(key.family(), KeyFamily::Rsa);
        assert!(key.can_sign());
        assert_eq!(calls(&counters), [1, 0, 0, 0]);
    }

    #[test]
    fn certificate_falls_through_to_last_strategy() {
        let (parser, counters) = counting_parser();
        let key = parser.parse_pem(RSA_CERT).unwrap();
        assert_eq!(key.family(), KeyFamily::Rsa);
        assert!(!key.can_sign());
        assert_eq!(calls(&counters), [1, 1, 1, 1]);
    }

    #[test]
    fn no_pem_block() {
        let err = parse_pem("definitely not a key").unwrap_err();
        assert!(matches!(err, JoseError::NotPemEncoded(_)));
    }

    #[test]
    fn garbage_in_pem_block() {
        let pem = encode_pem("PRIVATE KEY", b"garbage bytes");
        let err = parse_pem(pem).unwrap_err();
        assert!(matches!(err, JoseError::UnparsableKey(_)));
    }

    #[test]
    fn empty_parser_accepts_nothing() {
        let err = KeyParser::empty().parse_pem(RSA_PKCS1).unwrap_err();
        assert!(matches!(err, JoseError::UnparsableKey(_)));
    }

    #[test]
    fn exported_pems_parse_back() {
        for alg in [JWA::RS256, JWA::ES256, JWA::ES384, JWA::ES512] {
            let key = RawKey::generate(alg, None).unwrap();

            let private = parse_pem(key.to_private_pem().unwrap().as_bytes()).unwrap();
            assert!(private.can_sign());
            assert_eq!(private.family(), alg.family());

            let public = parse_pem(key.to_public_pem().unwrap()).unwrap();
            assert!(!public.can_sign());
            assert_eq!(
                public.public_key_der().unwrap(),
                key.public_key_der().unwrap()
            );
        }
    }

    #[test]
    fn pem_lines_are_wrapped() {
        let pem = encode_pem("PUBLIC KEY", &[0xab; 100]);
        let lines: Vec<_> = pem.lines().collect();
        assert_eq!(lines[0], "-----BEGIN PUBLIC KEY-----");
        assert_eq!(lines[1].len(), 64);
        assert_eq!(lines.last().copied(), Some("-----END PUBLIC KEY-----"));
    }
}
