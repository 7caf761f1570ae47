//! # Caller Identification
//!
//! Derives the caller's [`UserId`] from the `Authorization` header.
//!
//! ## Token Format
//!
//! ```text
//! Authorization: Bearer <header>.<claims>.<signature>
//! Authorization: <header>.<claims>.<signature>      (prefix optional)
//! ```
//!
//! The token is a compact JWT whose `sub` claim is the user's UUID.
//!
//! **Nothing in the token is verified.** The signature, the algorithm and
//! the time-based claims are ignored; any structurally valid token is
//! accepted and its subject trusted as-is. Run
//! this service only behind a gateway that has already authenticated the
//! token.
//!
//! ## AuthenticatedUser
//!
//! Handlers take an [`AuthenticatedUser`] argument; extraction failure
//! rejects the request with 401 before the body is read.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use geode_core::UserId;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a caller could not be identified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No `Authorization` header, or an empty one.
    #[error("no Authorization header")]
    MissingCredential,

    /// The credential is not a decodable compact token.
    #[error("failed to parse jwt: {0}")]
    MalformedToken(String),

    /// The token carries no `sub` claim.
    #[error("jwt has no subject claim")]
    MissingSubject,

    /// The `sub` claim is not a usable user id.
    #[error("invalid subject claim: {0}")]
    InvalidIdentity(#[from] geode_core::ValidationError),
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct SubjectClaims {
    sub: Option<String>,
}

fn decode_segment<T: DeserializeOwned>(segment: &str, part: &str) -> Result<T, IdentityError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| IdentityError::MalformedToken(format!("could not base64 decode {part}: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| IdentityError::MalformedToken(format!("could not JSON decode {part}: {e}")))
}

/// Extract the subject of a compact token without verifying it.
///
/// The token must have exactly three segments, a header naming some `alg`
/// and a JSON claims object. The algorithm is not interpreted and the
/// signature segment is never read.
pub fn token_subject(token: &str) -> Result<Option<String>, IdentityError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, claims, _signature] = segments.as_slice() else {
        return Err(IdentityError::MalformedToken(
            "token contains an invalid number of segments".to_string(),
        ));
    };

    let header: TokenHeader = decode_segment(header, "header")?;
    if header.alg.is_empty() {
        return Err(IdentityError::MalformedToken("signing method (alg) is unspecified".to_string()));
    }

    let claims: SubjectClaims = decode_segment(claims, "claims")?;
    Ok(claims.sub)
}

/// Resolve the caller's identity from request headers.
pub fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId, IdentityError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(v) if !v.is_empty() => v,
        _ => return Err(IdentityError::MissingCredential),
    };
    let value = value
        .to_str()
        .map_err(|e| IdentityError::MalformedToken(e.to_string()))?;

    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value);
    let subject = token_subject(token)?.ok_or(IdentityError::MissingSubject)?;

    Ok(UserId::parse(&subject)?)
}

/// The identified caller of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_headers(&parts.headers)
            .map(Self)
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use geode_core::ValidationError;
    use jsonwebtoken::{EncodingKey, Header};

    const USER: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn mint(claims: serde_json::Value) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"whatever-the-issuer-used"),
        )
        .unwrap()
    }

    fn raw_token(header: serde_json::Value, claims: serde_json::Value, signature: &str) -> String {
        format!(
            "{}.{}.{signature}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string()),
        )
    }

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn bearer_token_yields_subject() {
        let token = mint(serde_json::json!({ "sub": USER }));
        let id = user_id_from_headers(&headers_with(&format!("Bearer {token}"))).unwrap();
        assert_eq!(id.to_string(), USER);
    }

    #[test]
    fn prefix_is_optional() {
        let token = mint(serde_json::json!({ "sub": USER }));
        let id = user_id_from_headers(&headers_with(&token)).unwrap();
        assert_eq!(id.to_string(), USER);
    }

    #[test]
    fn signature_is_not_checked() {
        let token = mint(serde_json::json!({ "sub": USER }));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{unsigned}.c2lnbmF0dXJlLWZyb20tc29tZW9uZS1lbHNl");
        let id = user_id_from_headers(&headers_with(&format!("Bearer {forged}"))).unwrap();
        assert_eq!(id.to_string(), USER);
    }

    #[test]
    fn expired_token_is_accepted() {
        let token = mint(serde_json::json!({ "sub": USER, "exp": 1, "aud": "someone" }));
        assert!(user_id_from_headers(&headers_with(&format!("Bearer {token}"))).is_ok());
    }

    #[test]
    fn missing_header() {
        assert_eq!(
            user_id_from_headers(&HeaderMap::new()),
            Err(IdentityError::MissingCredential)
        );
    }

    #[test]
    fn empty_header() {
        assert_eq!(
            user_id_from_headers(&headers_with("")),
            Err(IdentityError::MissingCredential)
        );
    }

    #[test]
    fn garbage_token_is_malformed() {
        let result = user_id_from_headers(&headers_with("Bearer not-a-jwt"));
        assert!(matches!(result, Err(IdentityError::MalformedToken(_))));
    }

    #[test]
    fn lowercase_scheme_is_not_stripped() {
        let token = mint(serde_json::json!({ "sub": USER }));
        let result = user_id_from_headers(&headers_with(&format!("bearer {token}")));
        assert!(matches!(result, Err(IdentityError::MalformedToken(_))));
    }

    #[test]
    fn token_without_subject() {
        let token = mint(serde_json::json!({ "name": "Ada" }));
        assert_eq!(
            user_id_from_headers(&headers_with(&format!("Bearer {token}"))),
            Err(IdentityError::MissingSubject)
        );
    }

    #[test]
    fn subject_must_be_uuid() {
        let token = mint(serde_json::json!({ "sub": "ada@example.com" }));
        let result = user_id_from_headers(&headers_with(&format!("Bearer {token}")));
        assert!(matches!(
            result,
            Err(IdentityError::InvalidIdentity(ValidationError::InvalidUserId { .. }))
        ));
    }

    #[test]
    fn nil_subject_is_rejected() {
        let token = mint(serde_json::json!({ "sub": "00000000-0000-0000-0000-000000000000" }));
        assert_eq!(
            user_id_from_headers(&headers_with(&format!("Bearer {token}"))),
            Err(IdentityError::InvalidIdentity(ValidationError::NilUserId))
        );
    }

    #[test]
    fn token_subject_reads_claim() {
        let token = mint(serde_json::json!({ "sub": "abc" }));
        assert_eq!(token_subject(&token).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn unsigned_alg_none_token_is_accepted() {
        let token = raw_token(
            serde_json::json!({ "alg": "none", "typ": "JWT" }),
            serde_json::json!({ "sub": USER }),
            "",
        );
        let id = user_id_from_headers(&headers_with(&format!("Bearer {token}"))).unwrap();
        assert_eq!(id.to_string(), USER);
    }

    #[test]
    fn algorithm_is_not_interpreted() {
        for alg in ["ES512", "HS256", "RS256", "EdDSA", "made-up"] {
            let token = raw_token(
                serde_json::json!({ "alg": alg }),
                serde_json::json!({ "sub": USER }),
                "bm90LWEtc2lnbmF0dXJl",
            );
            assert_eq!(token_subject(&token).unwrap().as_deref(), Some(USER), "alg {alg}");
        }
    }

    #[test]
    fn header_must_name_an_algorithm() {
        let claims = serde_json::json!({ "sub": USER });
        for header in [
            serde_json::json!({ "typ": "JWT" }),
            serde_json::json!({ "alg": "" }),
            serde_json::json!({ "alg": 256 }),
        ] {
            let token = raw_token(header.clone(), claims.clone(), "");
            assert!(
                matches!(token_subject(&token), Err(IdentityError::MalformedToken(_))),
                "header {header}"
            );
        }
    }

    #[test]
    fn segment_count_must_be_three() {
        let token = mint(serde_json::json!({ "sub": USER }));
        let (two, _) = token.rsplit_once('.').unwrap();
        for candidate in [two.to_string(), format!("{token}.extra"), String::new()] {
            assert!(matches!(
                token_subject(&candidate),
                Err(IdentityError::MalformedToken(_))
            ));
        }
    }

    #[test]
    fn claims_must_be_base64url_json() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let not_base64 = format!("{header}.!!!.");
        let not_json = format!("{header}.{}.", URL_SAFE_NO_PAD.encode("sub=someone"));
        for token in [not_base64, not_json] {
            assert!(matches!(
                token_subject(&token),
                Err(IdentityError::MalformedToken(_))
            ));
        }
    }
}
