//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use inkpost_core::domain::Role;
use inkpost_core::ports::{DatabaseService, PortError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_id_from_headers;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

fn session_cookie(session_id: &str) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        Duration::days(30).num_seconds()
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Validate before touching anything else
    let email = req.email.trim().to_ascii_lowercase();
    if !email.contains('@') {
        return Err((StatusCode::BAD_REQUEST, "A valid email is required".to_string()));
    }
    if req.password.chars().count() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters".to_string(),
        ));
    }

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password".to_string(),
            )
        })?
        .to_string();

    // 3. Create the user; configured admin emails get the admin role
    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::Reader
    };
    let user = state
        .db
        .create_user_with_email(&email, &password_hash, role)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Email already registered".to_string(),
            ),
            e => {
                error!("Failed to create user: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create user".to_string(),
                )
            }
        })?;

    // 4. Create the auth session (30 days)
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(30);
    state
        .db
        .create_auth_session(&auth_session_id, user.user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    // 5. Return response with the session cookie
    let response = AuthResponse {
        user_id: user.user_id,
        email: user.email,
        role: user.role.as_str().to_string(),
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&auth_session_id))],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Get user by email
    let email = req.email.trim().to_ascii_lowercase();
    let user_creds = state.db.get_user_by_email(&email).await.map_err(|e| {
        error!("Failed to get user: {:?}", e);
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication error".to_string(),
        )
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        ));
    }

    // 3. Create the auth session (30 days)
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(30);
    state
        .db
        .create_auth_session(&auth_session_id, user_creds.user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    // 4. Return response with the session cookie
    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
        role: user_creds.role.as_str().to_string(),
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&auth_session_id))],
        Json(response),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract the session id from the cookie
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Delete the auth session from the database
    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to logout".to_string(),
            )
        })?;

    // 3. Clear the cookie
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json_body, test_state, MockClassifier, MockDb};
    use axum::response::IntoResponse;

    fn signup_req(email: &str, password: &str) -> Json<SignupRequest> {
        Json(SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    #[tokio::test]
    async fn configured_admin_email_gets_the_admin_role() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));

        let response = signup_handler(
            State(state.clone()),
            signup_req("admin@example.org", "correct horse battery"),
        )
        .await
        .unwrap()
        .into_response();
        assert!(response.headers().contains_key(header::SET_COOKIE));
        let auth: AuthResponse = json_body(response).await;
        assert_eq!(auth.role, "admin");

        let response = signup_handler(
            State(state.clone()),
            signup_req("reader@example.org", "correct horse battery"),
        )
        .await
        .unwrap()
        .into_response();
        let auth: AuthResponse = json_body(response).await;
        assert_eq!(auth.role, "reader");
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));

        signup_handler(
            State(state.clone()),
            signup_req("reader@example.org", "correct horse battery"),
        )
        .await
        .unwrap();

        let err = signup_handler(
            State(state.clone()),
            signup_req("reader@example.org", "another password"),
        )
        .await
        .err()
        .expect("second signup with the same email must fail");
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_rejects_a_wrong_password() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));

        signup_handler(
            State(state.clone()),
            signup_req("reader@example.org", "correct horse battery"),
        )
        .await
        .unwrap();

        let err = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                email: "reader@example.org".to_string(),
                password: "wrong password".to_string(),
            }),
        )
        .await
        .err()
        .expect("a wrong password must not log in");
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        let response = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                email: "reader@example.org".to_string(),
                password: "correct horse battery".to_string(),
            }),
        )
        .await
        .expect("the right password logs in")
        .into_response();
        let auth: AuthResponse = json_body(response).await;
        assert_eq!(auth.email, "reader@example.org");
    }

    #[tokio::test]
    async fn short_passwords_are_rejected_before_any_store_call() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));
        let err = signup_handler(State(state.clone()), signup_req("a@b.c", "short"))
            .await
            .err()
            .expect("short passwords are invalid");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
