use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use chainvoice_core::OwnerId;

use crate::context::OwnerContext;

/// Auth configuration: requests without a bearer owner token fall back to the
/// dev owner when one is configured.
#[derive(Clone)]
pub struct AuthState {
    pub default_owner: Option<OwnerId>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let owner = match extract_bearer(req.headers()) {
        Ok(token) => token
            .parse::<OwnerId>()
            .map_err(|_| StatusCode::UNAUTHORIZED)?,
        Err(missing) => state.default_owner.ok_or(missing)?,
    };

    req.extensions_mut().insert(OwnerContext::new(owner));
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
