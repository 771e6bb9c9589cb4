use crate::jose::{
    JWKEllipticCurves,
    constants::{
        BIT_STRING_NO_UNUSED_BITS, DER_LENGTH_SHORT_FORM_MAX, DER_TAG_BIT_STRING, DER_TAG_INTEGER,
        DER_TAG_SEQUENCE, EC_PUBLIC_KEY_OID, HIGH_BIT_MASK, P256_CURVE_OID, P384_CURVE_OID,
        P521_CURVE_OID, RSA_ALGORITHM_IDENTIFIER,
    },
};

/// In section 4.1 of [RFC 5280](https://datatracker.ietf.org/doc/rfc5280/) the standard DER
/// encoded public key format is defined as
///```rust,ignore
/// SubjectPublicKeyInfo = SEQUENCE {
///     algorithm AlgorithmIdentifier,
///     subjectPublicKey BIT STRING
/// }
///```
/// For RSA the bit string contains the DER encoded public key sequence of
/// section 2.3.1 of [RFC 3279](https://datatracker.ietf.org/doc/rfc3279/):
///```rust,ignore
/// RSAPublicKey = SEQUENCE {
///     modulus INTEGER,
///     exponent INTEGER,
/// }
/// ```
pub(crate) fn rsa_subject_public_key_info(n: &[u8], e: &[u8]) -> Vec<u8> {
    let mut rsa_public_key = encode_integer(n);
    rsa_public_key.extend(encode_integer(e));
    let rsa_public_key = encode_tlv(DER_TAG_SEQUENCE, &rsa_public_key);

    subject_public_key_info(&RSA_ALGORITHM_IDENTIFIER, &rsa_public_key)
}

/// Elliptic curve flavour of the SubjectPublicKeyInfo, see section 2 of
/// [RFC 5480](https://datatracker.ietf.org/doc/html/rfc5480).
///
/// The algorithm identifier carries the named curve as parameter and the
/// bit string holds the uncompressed point (`0x04 || x || y`) as is.
pub(crate) fn ec_subject_public_key_info(curve: JWKEllipticCurves, point: &[u8]) -> Vec<u8> {
    let curve_oid: &[u8] = match curve {
        JWKEllipticCurves::P256 => &P256_CURVE_OID,
        JWKEllipticCurves::P384 => &P384_CURVE_OID,
        JWKEllipticCurves::P521 => &P521_CURVE_OID,
    };

    let mut algorithm = EC_PUBLIC_KEY_OID.to_vec();
    algorithm.extend_from_slice(curve_oid);
    let algorithm = encode_tlv(DER_TAG_SEQUENCE, &algorithm);

    subject_public_key_info(&algorithm, point)
}

fn subject_public_key_info(algorithm_identifier: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut bit_string = Vec::with_capacity(1 + public_key.len());
    bit_string.push(BIT_STRING_NO_UNUSED_BITS);
    bit_string.extend_from_slice(public_key);

    let mut content = algorithm_identifier.to_vec();
    content.extend(encode_tlv(DER_TAG_BIT_STRING, &bit_string));
    encode_tlv(DER_TAG_SEQUENCE, &content)
}

fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = encode_der_length(content.len());
    let mut result = Vec::with_capacity(1 + len.len() + content.len());
    result.push(tag);
    result.extend(len);
    result.extend_from_slice(content);
    result
}

/// Length encoding as defined in section 8.1.3 of
/// [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf).
fn encode_der_length(len: usize) -> Vec<u8> {
    if len <= DER_LENGTH_SHORT_FORM_MAX {
        return vec![len as u8];
    }
    let len_bytes = len.to_be_bytes();
    let len_bytes = strip_leading_zeros(&len_bytes);
    let mut result = Vec::with_capacity(1 + len_bytes.len());
    result.push(HIGH_BIT_MASK | len_bytes.len() as u8);
    result.extend_from_slice(len_bytes);
    result
}

/// Minimal DER encoding of a positive big-endian integer.
///
/// Only meant for RSA moduli and exponents: leading zeros are stripped and
/// a single zero octet is prepended when the high bit is set.
fn encode_integer(value: &[u8]) -> Vec<u8> {
    let value = strip_leading_zeros(value);
    let needs_leading_zero = value.first().is_none_or(|b| b & HIGH_BIT_MASK != 0);
    let mut content = Vec::with_capacity(value.len() + 1);
    if needs_leading_zero {
        content.push(0);
    }
    content.extend_from_slice(value);
    encode_tlv(DER_TAG_INTEGER, &content)
}

pub(crate) fn strip_leading_zeros(value: &[u8]) -> &[u8] {
    let start = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    &value[start..]
}
