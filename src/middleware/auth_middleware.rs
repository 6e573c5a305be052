// Authentication middleware for protected routes
// Validates bearer tokens and injects AuthenticatedUser into request extensions

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{app::AppState, middleware::auth::AuthenticatedUser, utils::GenerationError};

/// Rejects requests without a valid bearer token
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return GenerationError::Unauthenticated.into_response();
    };

    match app_state.jwt_service.authenticate(bearer.token()) {
        Ok((user_id, claims)) => {
            request.extensions_mut().insert(AuthenticatedUser {
                user_id,
                email: claims.email,
                exp: claims.exp,
            });
            next.run(request).await
        },
        Err(e) => {
            tracing::warn!("JWT validation failed: {}", e);
            GenerationError::Unauthenticated.into_response()
        },
    }
}

/// Extractor for AuthenticatedUser from request extensions
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = GenerationError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(GenerationError::Unauthenticated)
    }
}
