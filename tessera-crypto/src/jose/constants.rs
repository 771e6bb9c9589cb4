pub(crate) use der_encoding_tags::*;
pub(crate) use algorithm_identifiers::*;

mod der_encoding_tags {
    /// Identifier tag for a DER encoded integer.
    /// Defined in [ITU X.680](https://www.itu.int/ITU-T/studygroups/com17/languages/X.680-0207.pdf).
    pub(crate) const DER_TAG_INTEGER: u8 = 0x02;
    /// Identifier tag for a DER encoded bit string.
    pub(crate) const DER_TAG_BIT_STRING: u8 = 0x03;
    /// Identifier tag for a DER encoded object identifier.
    pub(crate) const DER_TAG_OBJECT_IDENTIFIER: u8 = 0x06;
    /// Identifier tag for a DER encoded sequence.
    pub(crate) const DER_TAG_SEQUENCE: u8 = 0x30;
    /// Maximum length of a DER encoded length in short form.
    /// Defined in [ITU X.690](https://www.itu.int/ITU-T/studygroups/com17/languages/X.690-0207.pdf).
    pub(crate) const DER_LENGTH_SHORT_FORM_MAX: usize = 127;
    /// Octet that indicates that no unused bits are present in a bit string.
    pub(crate) const BIT_STRING_NO_UNUSED_BITS: u8 = 0x00;
    /// High bit of the first content octet, set for negative integers
    /// and for the long form of a length.
    pub(crate) const HIGH_BIT_MASK: u8 = 0x80;
}

mod algorithm_identifiers {
    /// DER encoded `AlgorithmIdentifier` for rsaEncryption.
    ///
    /// OID `1.2.840.113549.1.1.1` from appendix C of
    /// [RFC 8017](https://datatracker.ietf.org/doc/rfc8017/), with the NULL
    /// parameters required by section 2.3.1 of [RFC 3279](https://www.rfc-editor.org/rfc/rfc3279.html).
    pub(crate) const RSA_ALGORITHM_IDENTIFIER: [u8; 15] = [
        0x30, 0x0d, // SEQUENCE
        0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, // OID
        0x05, 0x00, // NULL
    ];

    /// DER encoded OID `1.2.840.10045.2.1` (id-ecPublicKey), section 2.1.1 of
    /// [RFC 5480](https://datatracker.ietf.org/doc/html/rfc5480).
    pub(crate) const EC_PUBLIC_KEY_OID: [u8; 9] =
        [0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];

    /// DER encoded OID `1.2.840.10045.3.1.7` (secp256r1).
    pub(crate) const P256_CURVE_OID: [u8; 10] =
        [0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

    /// DER encoded OID `1.3.132.0.34` (secp384r1).
    pub(crate) const P384_CURVE_OID: [u8; 7] = [0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22];

    /// DER encoded OID `1.3.132.0.35` (secp521r1).
    pub(crate) const P521_CURVE_OID: [u8; 7] = [0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x23];
}
