use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entity::{user_roles, users::Entity as Users, UserRoles},
    error::{AppError, AppResult},
    policy::{Actor, Role, RoleSet},
    state::AppState,
};

/// Claims carried by bearer tokens from the identity provider.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Authenticated caller with its role set resolved from `user_roles`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Actor);

impl std::ops::Deref for AuthUser {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Uuid> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
}

/// Mint a token for `user_id`. Only the seed binary and tests use this; the
/// running service never issues credentials.
pub fn issue_token(user_id: Uuid, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Load the role set of `user_id`. Unknown role strings in the store are skipped.
pub async fn load_roles(state: &AppState, user_id: Uuid) -> AppResult<RoleSet> {
    let rows = UserRoles::find()
        .filter(user_roles::Column::UserId.eq(user_id))
        .all(&state.orm)
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| Role::parse(&row.role))
        .collect())
}

pub async fn resolve_actor(state: &AppState, user_id: Uuid) -> AppResult<Actor> {
    if Users::find_by_id(user_id).one(&state.orm).await?.is_none() {
        return Err(AppError::Unauthorized("Unknown user".into()));
    }
    let roles = load_roles(state, user_id).await?;
    Ok(Actor::new(user_id, roles))
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        let user_id = decode_token(token, &state.jwt_secret)?;
        let actor = resolve_actor(&state, user_id).await?;
        Ok(AuthUser(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_to_the_same_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "secret", 1).unwrap();
        assert_eq!(decode_token(&token, "secret").unwrap(), user_id);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = issue_token(Uuid::new_v4(), "secret", 1).unwrap();
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
