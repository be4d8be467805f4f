use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    http_err::{ApiError, ApiResponse},
    identities::services::{UserError, UserService},
    server::AppState,
};

use super::JwtKeys;

pub fn routes() -> Router<AppState> {
    Router::new().route("/sessions", post(create_session))
}

#[derive(Deserialize)]
struct UsernamePasswordPair {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct SessionRep {
    token: String,
    token_type: &'static str,
    expires_in: i64,
}

async fn create_session(
    State(user_service): State<UserService>,
    State(keys): State<JwtKeys>,
    Json(credentials): Json<UsernamePasswordPair>,
) -> ApiResponse<(StatusCode, Json<SessionRep>)> {
    let user = match user_service
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(user) => user,
        Err(UserError::InvalidCredentials) => {
            return Err(ApiError::Unauthorized(
                "Invalid username or password.".to_owned(),
            ))
        }
        Err(error) => {
            error!(?error, "Failed to authenticate user.");

            return Err(ApiError::InternalServerError);
        }
    };

    let token = keys.issue(&user)?;

    debug!(user_id = user.id, "Issued session token.");

    Ok((
        StatusCode::CREATED,
        Json(SessionRep {
            token,
            token_type: "Bearer",
            expires_in: keys.lifetime().num_seconds(),
        }),
    ))
}
