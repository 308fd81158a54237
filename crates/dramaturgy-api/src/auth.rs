//! Session-token extractor and token helpers.
//!
//! The token arrives either as `Authorization: Bearer <token>` or in the
//! `dramaturgy_session` cookie. Only its SHA-256 hex digest is ever compared
//! against the identity store.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use dramaturgy_core::{
  Error,
  principal::Principal,
  store::{ForumStore, IdentityProvider},
};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "dramaturgy_session";

/// The authenticated principal of the current request. Extraction fails with
/// 401 when no valid, unexpired session accompanies the request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentPrincipal(pub Principal);

/// SHA-256 hex digest of a session token, as stored in the `sessions` table.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// A fresh random session token (32 bytes, hex encoded).
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Pull the raw session token out of the request headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  if let Some(token) = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
  {
    return Some(token);
  }

  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
    .map(|(_, value)| value)
}

impl<S> FromRequestParts<AppState<S>> for CurrentPrincipal
where
  S: ForumStore + IdentityProvider + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token_hash = session_token(&parts.headers)
      .map(hash_token)
      .ok_or(Error::Unauthorized)?;

    let principal = state
      .store
      .resolve_session(&token_hash, Utc::now())
      .await
      .map_err(Error::storage("resolve_session"))?;

    match principal {
      Some(p) => Ok(CurrentPrincipal(p)),
      None => {
        tracing::warn!("rejected unknown or expired session token");
        Err(Error::Unauthorized.into())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
    let mut h = HeaderMap::new();
    for (k, v) in pairs {
      h.append(k.clone(), HeaderValue::from_static(v));
    }
    h
  }

  #[test]
  fn bearer_token_is_preferred() {
    let h = headers(&[
      (header::AUTHORIZATION, "Bearer tok-a"),
      (header::COOKIE, "dramaturgy_session=tok-b"),
    ]);
    assert_eq!(session_token(&h), Some("tok-a"));
  }

  #[test]
  fn cookie_is_found_among_others() {
    let h = headers(&[(header::COOKIE, "theme=dark; dramaturgy_session=tok-b; x=1")]);
    assert_eq!(session_token(&h), Some("tok-b"));
  }

  #[test]
  fn missing_or_malformed_credentials() {
    assert_eq!(session_token(&HeaderMap::new()), None);
    assert_eq!(session_token(&headers(&[(header::AUTHORIZATION, "Basic dXNlcjpw")])), None);
    assert_eq!(session_token(&headers(&[(header::AUTHORIZATION, "Bearer ")])), None);
    assert_eq!(session_token(&headers(&[(header::COOKIE, "dramaturgy_session=")])), None);
  }

  #[test]
  fn token_hash_is_sha256_hex() {
    assert_eq!(
      hash_token("abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    let t = generate_token();
    assert_eq!(t.len(), 64);
    assert_ne!(t, generate_token());
  }
}
