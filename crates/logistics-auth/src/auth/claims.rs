//! JWT claims and the identity derived from them

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Kind of principal behind a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    #[default]
    Customer,
    AgencyEmployee,
    PlatformAdmin,
}

impl ActorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::AgencyEmployee => "AGENCY_EMPLOYEE",
            Self::PlatformAdmin => "PLATFORM_ADMIN",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "AGENCY_EMPLOYEE" => Ok(Self::AgencyEmployee),
            "PLATFORM_ADMIN" => Ok(Self::PlatformAdmin),
            other => Err(Error::Config(format!("unknown actor type: {other}"))),
        }
    }
}

/// Payload of an access token as issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default, deserialize_with = "lenient_actor_type")]
    pub actor_type: Option<ActorType>,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl JwtClaims {
    /// Decode the payload of a compact JWT without verifying its signature.
    ///
    /// Tokens held by a client session were already validated by the identity
    /// provider; the backend re-validates them on every call. Any signing
    /// algorithm is accepted and expiry is not checked, so that an expired
    /// session can still be described.
    pub fn decode_unverified(token: &str) -> Result<Self> {
        jsonwebtoken::dangerous::insecure_decode::<Self>(token)
            .map(|data| data.claims)
            .map_err(|e| Error::InvalidToken(e.to_string()))
    }
}

/// Unknown actor types read as absent instead of rejecting the whole token
fn lenient_actor_type<'de, D>(deserializer: D) -> std::result::Result<Option<ActorType>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.parse() {
        Ok(actor_type) => Ok(Some(actor_type)),
        Err(_) => {
            tracing::warn!(actor_type = %raw, "Unrecognized actor type claim, treating as absent");
            Ok(None)
        }
    }
}

/// Identity of the signed-in principal, derived from token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
    pub actor_type: ActorType,
    pub agency_id: Option<String>,
    pub roles: BTreeSet<String>,
    pub token_expiry: DateTime<Utc>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        let token_expiry =
            DateTime::from_timestamp_millis(claims.exp.saturating_mul(1000)).unwrap_or_default();

        Self {
            id: claims.sub.clone(),
            actor_type: claims.actor_type.unwrap_or_default(),
            agency_id: claims.agency_id.clone(),
            roles: claims.roles.iter().flatten().cloned().collect(),
            token_expiry,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.roles.contains(r.as_ref()))
    }

    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().all(|r| self.roles.contains(r.as_ref()))
    }

    pub fn belongs_to_agency(&self, agency_id: &str) -> bool {
        self.actor_type == ActorType::AgencyEmployee && self.agency_id.as_deref() == Some(agency_id)
    }

    pub fn is_token_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry <= now
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    fn agency_claims() -> JwtClaims {
        serde_json::from_str(
            r#"{
                "sub": "u1",
                "exp": 1700000000,
                "iss": "http://localhost:8080/realms/logistics",
                "actor_type": "AGENCY_EMPLOYEE",
                "agency_id": "ag-7",
                "roles": ["AGENCY_ADMIN", "AGENCY_ADMIN", "SHIPMENT_MANAGER"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_minimal_claims() {
        let claims: JwtClaims = serde_json::from_str(r#"{"sub": "u1", "exp": 1700000000}"#).unwrap();
        assert_eq!(claims.sub, "u1");
        assert!(claims.actor_type.is_none());
        assert!(claims.agency_id.is_none());
        assert!(claims.roles.is_none());
    }

    #[test]
    fn test_missing_actor_type_defaults_to_customer() {
        let claims: JwtClaims = serde_json::from_str(r#"{"sub": "u1", "exp": 1700000000}"#).unwrap();
        let user = AuthenticatedUser::from_claims(&claims);
        assert_eq!(user.actor_type, ActorType::Customer);
        assert!(user.agency_id.is_none());
        assert!(user.roles.is_empty());
    }

    #[test]
    fn test_roles_are_deduplicated() {
        let user = AuthenticatedUser::from_claims(&agency_claims());
        assert_eq!(user.roles.len(), 2);
        assert!(user.has_role("AGENCY_ADMIN"));
        assert!(user.has_role("SHIPMENT_MANAGER"));
    }

    #[test]
    fn test_token_expiry_from_exp() {
        let user = AuthenticatedUser::from_claims(&agency_claims());
        assert_eq!(user.token_expiry.timestamp(), 1_700_000_000);
        assert!(user.is_token_expired_at(Utc::now()));
    }

    #[test]
    fn test_role_queries() {
        let user = AuthenticatedUser::from_claims(&agency_claims());
        assert!(user.has_any_role(&["PARCEL_MANAGER", "SHIPMENT_MANAGER"]));
        assert!(!user.has_any_role(&["PLATFORM_ADMIN"]));
        assert!(user.has_all_roles(&["AGENCY_ADMIN", "SHIPMENT_MANAGER"]));
        assert!(!user.has_all_roles(&["AGENCY_ADMIN", "DELIVERY_DRIVER"]));
        assert!(user.has_all_roles::<&str>(&[]));
        assert!(!user.has_any_role::<&str>(&[]));
    }

    #[test]
    fn test_belongs_to_agency_requires_employee() {
        let mut claims = agency_claims();
        let user = AuthenticatedUser::from_claims(&claims);
        assert!(user.belongs_to_agency("ag-7"));
        assert!(!user.belongs_to_agency("ag-9"));

        claims.actor_type = Some(ActorType::Customer);
        let user = AuthenticatedUser::from_claims(&claims);
        assert!(!user.belongs_to_agency("ag-7"));
    }

    #[test]
    fn test_actor_type_from_str() {
        assert_eq!("agency-employee".parse::<ActorType>().unwrap(), ActorType::AgencyEmployee);
        assert_eq!("PLATFORM_ADMIN".parse::<ActorType>().unwrap(), ActorType::PlatformAdmin);
        assert!("driver".parse::<ActorType>().is_err());
    }

    #[test]
    fn test_decode_unverified() {
        let claims = agency_claims();
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"issuer-secret"),
        )
        .unwrap();

        let decoded = JwtClaims::decode_unverified(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_decode_unverified_accepts_rs256_header() {
        // {"alg":"RS256","typ":"JWT","kid":"k1"} with a dummy signature
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6ImsxIn0.\
                     eyJzdWIiOiJ1MSIsImV4cCI6NDEwMjQ0NDgwMCwiYWN0b3JfdHlwZSI6IkFHRU5DWV9FTVBMT1lFRSIsImFnZW5jeV9pZCI6ImFnLTciLCJyb2xlcyI6WyJBR0VOQ1lfQURNSU4iXX0.\
                     c2ln";

        let claims = JwtClaims::decode_unverified(token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.exp, 4_102_444_800);
        assert_eq!(claims.actor_type, Some(ActorType::AgencyEmployee));
        assert_eq!(claims.agency_id.as_deref(), Some("ag-7"));
        assert_eq!(claims.roles, Some(vec!["AGENCY_ADMIN".to_string()]));
    }

    #[test]
    fn test_unknown_actor_type_reads_as_absent() {
        let claims: JwtClaims =
            serde_json::from_str(r#"{"sub": "u2", "exp": 1700000000, "actor_type": "DRIVER"}"#)
                .unwrap();
        assert!(claims.actor_type.is_none());

        let claims: JwtClaims =
            serde_json::from_str(r#"{"sub": "u2", "exp": 1700000000, "actor_type": null}"#)
                .unwrap();
        assert!(claims.actor_type.is_none());

        let user = AuthenticatedUser::from_claims(&claims);
        assert_eq!(user.actor_type, ActorType::Customer);
        assert!(user.agency_id.is_none());
    }

    #[test]
    fn test_decode_unverified_rejects_garbage() {
        let err = JwtClaims::decode_unverified("not-a-token").unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)));
    }
}
