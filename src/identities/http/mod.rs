use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::error;

use crate::{
    authentication::TokenClaims,
    authorization::require_admin,
    http_err::{ApiError, ApiResponse},
    server::AppState,
};

use super::{
    domain::users::{NewUserData, UserChangesData, UserId},
    services::{UserError, UserService},
};

pub mod reps;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn validation_error(rep: reps::UserValidationError) -> ApiError {
    match serde_json::to_value(rep) {
        Ok(errors) => ApiError::BadRequestRep(errors),
        Err(error) => {
            error!(?error, "Failed to serialize user validation errors.");

            ApiError::InternalServerError
        }
    }
}

impl From<UserError> for ApiError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::InvalidUser(context) => validation_error(context.into()),
            UserError::DuplicateUsername => validation_error(reps::UserValidationError {
                username: vec!["This username is already taken.".to_owned()],
                ..Default::default()
            }),
            UserError::DuplicateEmail => validation_error(reps::UserValidationError {
                email: vec!["This email address is already in use.".to_owned()],
                ..Default::default()
            }),
            UserError::InvalidCredentials => {
                Self::Unauthorized("The provided password is incorrect.".to_owned())
            }
            UserError::NotFound => Self::not_found("user"),
            UserError::Other(error) => {
                error!(?error, "User operation failed.");

                Self::InternalServerError
            }
        }
    }
}

async fn create_user(
    State(user_service): State<UserService>,
    Json(new_user_data): Json<NewUserData>,
) -> ApiResponse<(StatusCode, Json<reps::User>)> {
    let user = user_service.create_user(new_user_data).await?;

    Ok((StatusCode::CREATED, Json(reps::User::from(&user))))
}

async fn get_me(
    claims: TokenClaims,
    State(user_service): State<UserService>,
) -> ApiResponse<Json<reps::User>> {
    let user = user_service.get_user(claims.user_id()).await?;

    Ok(Json((&user).into()))
}

async fn update_me(
    claims: TokenClaims,
    State(user_service): State<UserService>,
    Json(update): Json<reps::OwnUserChanges>,
) -> ApiResponse<Json<reps::User>> {
    let user = user_service
        .update_own_user(claims.user_id(), &update.current_password, update.changes)
        .await?;

    Ok(Json((&user).into()))
}

async fn list_users(
    claims: TokenClaims,
    State(user_service): State<UserService>,
) -> ApiResponse<Json<Vec<reps::User>>> {
    require_admin(&claims)?;

    let users = user_service.list_users().await?;

    Ok(Json(users.iter().map(reps::User::from).collect()))
}

async fn get_user(
    claims: TokenClaims,
    State(user_service): State<UserService>,
    Path(user_id): Path<UserId>,
) -> ApiResponse<Json<reps::User>> {
    require_admin(&claims)?;

    let user = user_service.get_user(user_id).await?;

    Ok(Json((&user).into()))
}

async fn update_user(
    claims: TokenClaims,
    State(user_service): State<UserService>,
    Path(user_id): Path<UserId>,
    Json(changes): Json<UserChangesData>,
) -> ApiResponse<Json<reps::User>> {
    require_admin(&claims)?;

    let user = user_service.update_user(user_id, changes).await?;

    Ok(Json((&user).into()))
}

async fn delete_user(
    claims: TokenClaims,
    State(user_service): State<UserService>,
    Path(user_id): Path<UserId>,
) -> ApiResponse<StatusCode> {
    require_admin(&claims)?;

    user_service.delete_user(user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
