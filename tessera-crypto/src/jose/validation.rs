use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Deserializer};
use tessera_utils::macros::generate_set_and_with;

use crate::jose::{Claims, JoseError, NumericDate};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Claims validation options of a [`Verifier`](crate::jose::Verifier).
///
/// A token is valid at `now` when
///
/// - it carries an `exp` claim and `now <= exp + leeway`;
/// - it carries no `nbf` claim, or `now >= nbf - leeway`;
/// - its `iss` claim equals the expected issuer.
///
/// The default leeway is zero: bounds are compared exactly.
pub struct Validation {
    issuer: String,
    #[serde(default, deserialize_with = "deserialize_leeway")]
    leeway: SignedDuration,
}

fn deserialize_leeway<'de, D>(deserializer: D) -> Result<SignedDuration, D::Error>
where
    D: Deserializer<'de>,
{
    SignedDuration::deserialize(deserializer).map(SignedDuration::abs)
}

impl Validation {
    /// Create a [`Validation`] expecting the given issuer, without leeway.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            leeway: SignedDuration::ZERO,
        }
    }

    /// Expected issuer
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Clock skew tolerated on both temporal bounds
    pub fn leeway(&self) -> SignedDuration {
        self.leeway
    }

    generate_set_and_with! {
        /// Set the clock skew tolerated on both temporal bounds.
        ///
        /// Negative durations are taken as their absolute value.
        pub fn leeway(mut self, leeway: SignedDuration) -> Self {
            self.leeway = leeway.abs();
            self
        }
    }

    /// Validate the claims against the current time.
    pub fn validate(&self, claims: &Claims) -> Result<(), JoseError> {
        self.validate_at(claims, Timestamp::now())
    }

    /// Validate the claims against the given time.
    ///
    /// `now` keeps its sub-second precision: a token expiring at second
    /// `exp` is expired at any instant after it.
    pub fn validate_at(&self, claims: &Claims, now: Timestamp) -> Result<(), JoseError> {
        let since_epoch = now.as_duration();

        let exp = claims.exp.ok_or(JoseError::MissingClaim { claim: "exp" })?;
        if since_epoch > exp.as_duration().saturating_add(self.leeway) {
            return Err(JoseError::TokenExpired {
                exp,
                now: NumericDate::from_timestamp(now),
            });
        }

        if let Some(nbf) = claims.nbf
            && since_epoch < nbf.as_duration().saturating_sub(self.leeway)
        {
            return Err(JoseError::TokenNotYetValid {
                nbf,
                now: NumericDate::from_timestamp(now),
            });
        }

        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(JoseError::IssuerMismatch {
                expected: self.issuer.clone(),
                found: claims.iss.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    const ISSUER: &str = "auth.example.com";

    fn claims(nbf: i64, exp: i64) -> Claims {
        Claims {
            iss: Some(ISSUER.to_owned()),
            nbf: Some(NumericDate::from_seconds(nbf)),
            exp: Some(NumericDate::from_seconds(exp)),
            ..Default::default()
        }
    }

    fn at(seconds: i64) -> Timestamp {
        Timestamp::from_second(seconds).unwrap()
    }

    #[test]
    fn temporal_bounds_are_exact_without_leeway() {
        let validation = Validation::new(ISSUER);
        let claims = claims(1_000, 1_010);

        assert_ok!(validation.validate_at(&claims, at(1_000)));
        assert_ok!(validation.validate_at(&claims, at(1_005)));
        assert_ok!(validation.validate_at(&claims, at(1_010)));

        let err = assert_err!(validation.validate_at(&claims, at(1_011)));
        assert!(matches!(err, JoseError::TokenExpired { .. }), "{err}");

        let err = assert_err!(validation.validate_at(&claims, at(999)));
        assert!(matches!(err, JoseError::TokenNotYetValid { .. }), "{err}");
    }

    #[test]
    fn expiry_is_exact_below_the_second() {
        let validation = Validation::new(ISSUER);
        let claims = claims(1_000, 1_010);

        let late = Timestamp::new(1_010, 500_000_000).unwrap();
        let err = assert_err!(validation.validate_at(&claims, late));
        assert!(matches!(err, JoseError::TokenExpired { .. }), "{err}");

        let early = Timestamp::new(999, 999_999_999).unwrap();
        let err = assert_err!(validation.validate_at(&claims, early));
        assert!(matches!(err, JoseError::TokenNotYetValid { .. }), "{err}");

        let validation = validation.with_leeway(SignedDuration::from_millis(500));
        assert_ok!(validation.validate_at(&claims, late));
        assert_err!(validation.validate_at(&claims, Timestamp::new(1_010, 500_000_001).unwrap()));
    }

    #[test]
    fn leeway_widens_both_bounds() {
        let validation = Validation::new(ISSUER).with_leeway(SignedDuration::from_secs(-5));
        assert_eq!(validation.leeway(), SignedDuration::from_secs(5));
        let claims = claims(1_000, 1_010);

        assert_ok!(validation.validate_at(&claims, at(995)));
        assert_ok!(validation.validate_at(&claims, at(1_015)));
        assert_err!(validation.validate_at(&claims, at(994)));
        assert_err!(validation.validate_at(&claims, at(1_016)));
    }

    #[test]
    fn missing_exp_is_rejected() {
        let validation = Validation::new(ISSUER);
        let mut claims = claims(1_000, 1_010);
        claims.exp = None;
        let err = assert_err!(validation.validate_at(&claims, at(1_005)));
        assert!(matches!(err, JoseError::MissingClaim { claim: "exp" }), "{err}");
    }

    #[test]
    fn missing_nbf_has_no_lower_bound() {
        let validation = Validation::new(ISSUER);
        let mut claims = claims(1_000, 1_010);
        claims.nbf = None;
        assert_ok!(validation.validate_at(&claims, at(0)));
    }

    #[test]
    fn issuer_must_match() {
        let validation = Validation::new(ISSUER);
        let mut claims = claims(1_000, 1_010);

        claims.iss = Some("evil.example.com".to_owned());
        let err = assert_err!(validation.validate_at(&claims, at(1_005)));
        assert!(
            matches!(&err, JoseError::IssuerMismatch { found: Some(found), .. } if found == "evil.example.com"),
            "{err}"
        );

        claims.iss = None;
        let err = assert_err!(validation.validate_at(&claims, at(1_005)));
        assert!(matches!(err, JoseError::IssuerMismatch { found: None, .. }), "{err}");
    }

    #[test]
    fn leeway_deserializes_from_friendly_durations() {
        let validation: Validation =
            serde_json::from_str(r#"{"issuer":"auth.example.com","leeway":"30s"}"#).unwrap();
        assert_eq!(validation.leeway(), SignedDuration::from_secs(30));

        let validation: Validation = serde_json::from_str(r#"{"issuer":"auth.example.com"}"#).unwrap();
        assert_eq!(validation.leeway(), SignedDuration::ZERO);
    }

    #[test]
    fn negative_leeway_deserializes_as_its_absolute_value() {
        let validation: Validation =
            serde_json::from_str(r#"{"issuer":"auth.example.com","leeway":"-5s"}"#).unwrap();
        assert_eq!(validation.leeway(), SignedDuration::from_secs(5));
        assert_ok!(validation.validate_at(&claims(1_000, 1_010), at(1_007)));
        assert_ok!(validation.validate_at(&claims(1_000, 1_010), at(1_015)));
    }
}
