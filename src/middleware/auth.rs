use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

/// The acting identity, handed explicitly to every mutating operation.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    /// Profile id of the caller.
    pub sub: String,
    pub exp: usize,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Auth | JWT decode error");
        StatusCode::UNAUTHORIZED
    })?;

    let id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| {
        tracing::debug!(sub = %token_data.claims.sub, "Auth | subject is not a profile id");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(AuthUser { id });

    Ok(next.run(req).await)
}
