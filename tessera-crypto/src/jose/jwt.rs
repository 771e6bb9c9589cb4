use std::fmt;

use jiff::{SignedDuration, Timestamp};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
/// Seconds since the unix epoch, as used by the `iat`, `nbf` and `exp` claims
/// (section 2 of [`rfc7519`]).
///
/// Fractional seconds are accepted on input and truncated.
///
/// [`rfc7519`]: https://datatracker.ietf.org/doc/html/rfc7519#section-2
pub struct NumericDate(i64);

impl NumericDate {
    /// Create a [`NumericDate`] from seconds since the unix epoch.
    pub const fn from_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Seconds since the unix epoch.
    pub const fn as_seconds(self) -> i64 {
        self.0
    }

    /// The [`NumericDate`] of a timestamp, sub-second precision is dropped.
    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self(ts.as_second())
    }

    /// Seconds since the unix epoch as a duration.
    pub const fn as_duration(self) -> SignedDuration {
        SignedDuration::from_secs(self.0)
    }

    /// The timestamp of this date, if representable.
    pub fn to_timestamp(self) -> Option<Timestamp> {
        Timestamp::from_second(self.0).ok()
    }

    #[must_use]
    /// Shift by a (possibly negative) duration, saturating at the bounds.
    pub fn saturating_add(self, duration: SignedDuration) -> Self {
        Self(self.0.saturating_add(duration.as_secs()))
    }
}

impl From<Timestamp> for NumericDate {
    fn from(ts: Timestamp) -> Self {
        Self::from_timestamp(ts)
    }
}

impl fmt::Display for NumericDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_timestamp() {
            Some(ts) => write!(f, "{ts}"),
            None => write!(f, "{}", self.0),
        }
    }
}

impl<'de> Deserialize<'de> for NumericDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NumericDateVisitor;

        impl Visitor<'_> for NumericDateVisitor {
            type Value = NumericDate;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("seconds since the unix epoch")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(NumericDate(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(NumericDate)
                    .map_err(|_overflow| E::custom("numeric date out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
                    Ok(NumericDate(v.trunc() as i64))
                } else {
                    Err(E::custom("numeric date out of range"))
                }
            }
        }

        deserializer.deserialize_any(NumericDateVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The `aud` claim: a single audience string or an array of them.
///
/// Serializes back to the same shape: a single audience as a string.
pub struct Audience(Vec<String>);

impl Audience {
    /// Create a single valued [`Audience`].
    pub fn new(audience: impl Into<String>) -> Self {
        Self(vec![audience.into()])
    }

    /// Whether the given audience is part of this claim.
    pub fn contains(&self, audience: &str) -> bool {
        self.0.iter().any(|aud| aud == audience)
    }

    /// Iterate the audiences.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Audience {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Vec<String>> for Audience {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl Serialize for Audience {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(aud) => Self(vec![aud]),
            OneOrMany::Many(aud) => Self(aud),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// JWT claims set: the registered claims of section 4.1 of [`rfc7519`],
/// client scopes, the identity of the end user and any other application claim.
///
/// A [`Signer`](crate::jose::Signer) stamps `iss`, `iat`, `nbf` and `exp`
/// when minting a token; a verified token hands out its claims read-only.
///
/// [`rfc7519`]: https://datatracker.ietf.org/doc/html/rfc7519#section-4.1
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<NumericDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Scopes granted to the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Identity of the end user the token was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserClaims>,
    /// Any other claim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Identity of the end user on whose behalf the client acts.
pub struct UserClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Scopes granted to the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl Claims {
    /// Create an empty claims set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes granted to the client, if present.
    pub fn client_scopes(&self) -> Option<&[String]> {
        self.scopes.as_deref()
    }

    /// Scopes granted to the end user, if present.
    pub fn user_scopes(&self) -> Option<&[String]> {
        self.user.as_ref().and_then(|user| user.scopes.as_deref())
    }

    /// Look up an application claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
