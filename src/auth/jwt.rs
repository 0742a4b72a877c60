use crate::{auth::AuthError, now, AppState, Error, Result};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use tracing::error;

use super::SessionUser;

/// Access token claims, as issued by the auth backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JwtToken {
    // issued at
    pub iat: i64,
    // expiration
    pub exp: i64,
    // data
    pub id: i64,
    pub role: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl JwtToken {
    pub fn new(id: i64, role: impl Into<String>, email: impl Into<String>, expiry: usize) -> Self {
        let now = now() as i64;
        Self {
            iat: now,
            exp: now + expiry as i64,
            id,
            role: role.into(),
            email: email.into(),
            name: None,
            surname: None,
        }
    }

    pub fn from_str(token: &str, secret: &[u8]) -> Result<Self, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        jsonwebtoken::decode::<JwtToken>(token, &DecodingKey::from_secret(secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                    AuthError::Expired
                } else {
                    AuthError::Jwt(e)
                }
            })
    }

    pub fn encode(&self, secret: &[u8]) -> Result<String, AuthError> {
        Ok(jsonwebtoken::encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret),
        )?)
    }

    pub fn is_expired(&self) -> bool {
        self.exp < now() as i64
    }
}

/// Route guard: a signed-in user whose role is allowed on the donation routes.
#[derive(Debug)]
pub struct AuthedUser {
    pub user: SessionUser,
}

impl AuthedUser {
    pub fn from_token(token: &str, state: &AppState) -> Result<Self, Error> {
        let secret = state
            .setting
            .auth
            .secret
            .as_ref()
            .ok_or(Error::Unavailable)?;
        let claims = JwtToken::from_str(token, secret.as_bytes()).map_err(|e| {
            error!(error = e.to_string(), "rejected access token");
            e
        })?;
        let user = state
            .sessions
            .current(claims.id)?
            .filter(|u| u.access_token == token)
            .ok_or(AuthError::NoSession)?;
        if !state.setting.auth.allows(&user.role) {
            return Err(Error::Forbidden);
        }
        Ok(Self { user })
    }
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    let auth = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer")
        .or_else(|| auth.strip_prefix("bearer"))
        .map(str::trim)
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = Ready<Result<AuthedUser>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let res = match (req.app_data::<web::Data<AppState>>(), bearer(req)) {
            (Some(state), Some(token)) => AuthedUser::from_token(token, state),
            _ => Err(AuthError::Invalid("missing auth token").into()),
        };
        ready(res)
    }
}
