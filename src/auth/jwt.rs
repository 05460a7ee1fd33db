//! JWT verification and role-derived permission checks at the submission
//! boundary.
//!
//! No direct teacher counterpart; `jsonwebtoken` usage is grounded on the
//! stack seen across the broader example pack's manifests (see
//! DESIGN.md). Claims parsing and role->permission mapping are pure
//! functions so they're testable without a live JWKS server.

use std::collections::HashMap;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::domain::error::AuthError;

#[derive(Debug, Clone, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    pub exp: usize,
}

impl Claims {
    /// `roles[]`, merged with `realm_access.roles` when present.
    #[must_use]
    pub fn effective_roles(&self) -> Vec<String> {
        let mut roles = self.roles.clone();
        if let Some(realm) = &self.realm_access {
            roles.extend(realm.roles.clone());
        }
        roles
    }

    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref().or(self.org.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    EnqueueJobs,
    ViewStatus,
}

impl Permission {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnqueueJobs => "enqueue_jobs",
            Self::ViewStatus => "view_status",
        }
    }
}

/// Pure function: role -> granted permission set, per spec §4.9.
#[must_use]
pub fn permissions_for_roles(roles: &[String]) -> Vec<Permission> {
    let mut perms = Vec::new();
    for role in roles {
        match role.as_str() {
            "admin" => return vec![Permission::EnqueueJobs, Permission::ViewStatus],
            "developer" => {
                perms.push(Permission::EnqueueJobs);
                perms.push(Permission::ViewStatus);
            }
            "viewer" => perms.push(Permission::ViewStatus),
            _ => {}
        }
    }
    perms.sort_by_key(|p| p.as_str());
    perms.dedup_by_key(|p| p.as_str());
    perms
}

#[must_use]
pub fn is_admin(roles: &[String]) -> bool {
    roles.iter().any(|r| r == "admin")
}

/// Tenant authorization: admins may cross tenants; everyone else's token
/// tenant must match the requested tenant.
pub fn authorize_tenant(claims: &Claims, requested_tenant: &str) -> Result<(), AuthError> {
    if is_admin(&claims.effective_roles()) {
        return Ok(());
    }
    match claims.tenant() {
        Some(t) if t == requested_tenant => Ok(()),
        _ => Err(AuthError::TenantMismatch {
            token_tenant: claims.tenant().unwrap_or_default().to_string(),
            requested: requested_tenant.to_string(),
        }),
    }
}

/// Checks that the role-derived permission set for `claims` includes
/// `required`.
pub fn require_permission(claims: &Claims, required: Permission) -> Result<(), AuthError> {
    let granted = permissions_for_roles(&claims.effective_roles());
    if granted.contains(&required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermission(
            required.as_str().to_string(),
            claims.effective_roles().join(","),
        ))
    }
}

pub struct AuthConfig {
    pub required: bool,
    pub jwks_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Verifies `token` against either an HMAC secret or a JWKS-fetched RSA
/// key, checking the configured issuer/audience, and returns the parsed
/// claims.
pub async fn verify(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(if config.jwt_secret.is_some() {
        Algorithm::HS256
    } else {
        Algorithm::RS256
    });
    if let Some(iss) = &config.issuer {
        validation.set_issuer(&[iss]);
    }
    if let Some(aud) = &config.audience {
        validation.set_audience(&[aud]);
    }

    let key = if let Some(secret) = &config.jwt_secret {
        DecodingKey::from_secret(secret.as_bytes())
    } else if let Some(jwks_url) = &config.jwks_url {
        fetch_jwks_key(jwks_url, token).await?
    } else {
        return Err(AuthError::InvalidToken("no verification key configured".to_string()));
    };

    let data = decode::<Claims>(token, &key, &validation)
        .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    Ok(data.claims)
}

async fn fetch_jwks_key(jwks_url: &str, token: &str) -> Result<DecodingKey, AuthError> {
    #[derive(Deserialize)]
    struct Jwk {
        kid: Option<String>,
        n: String,
        e: String,
    }
    #[derive(Deserialize)]
    struct Jwks {
        keys: Vec<Jwk>,
    }

    let header = jsonwebtoken::decode_header(token).map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    let jwks: Jwks = reqwest::get(jwks_url)
        .await
        .map_err(|err| AuthError::JwksFetch(err.to_string()))?
        .json()
        .await
        .map_err(|err| AuthError::JwksFetch(err.to_string()))?;

    let jwk = jwks
        .keys
        .into_iter()
        .find(|k| header.kid.is_none() || k.kid == header.kid)
        .ok_or_else(|| AuthError::JwksFetch("no matching key in JWKS".to_string()))?;

    DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|err| AuthError::InvalidToken(err.to_string()))
}

/// Extracts the bearer token from an `Authorization` header map.
pub fn extract_bearer(headers: &HashMap<String, String>) -> Result<&str, AuthError> {
    let header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or(AuthError::MissingToken)?;
    header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)
}
