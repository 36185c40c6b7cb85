use axum::{
    extract::{FromRef, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    slug::slugify,
    state::AppState,
    users::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoggedInQuery,
            LoggedInResponse, LoginRequest, LogoutRequest, MessageResponse, Profile,
            ProfileTokenResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
            UpdateProfileRequest,
        },
        repo::{ResetToken, SessionToken, User},
        services,
    },
};

// Identical for unknown email and failed password check.
const WRONG_CREDENTIALS: &str = "Wrong email/password combination";

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), (StatusCode, String)> {
    let name = payload.name.trim();
    if name.len() < 2 || name.len() > 25 {
        warn!("register: bad name length");
        return Err((
            StatusCode::BAD_REQUEST,
            "Name must be between 2 and 25 characters".into(),
        ));
    }
    if !services::is_valid_email(&payload.email) {
        warn!(email = %payload.email, "register: invalid email");
        return Err((
            StatusCode::BAD_REQUEST,
            "Email address is invalid".into(),
        ));
    }
    if payload.password.len() < 6 {
        warn!("register: password too short");
        return Err((
            StatusCode::BAD_REQUEST,
            "Password should be at least 6 characters long".into(),
        ));
    }

    // Ensure email is not taken
    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "register: email already registered");
            return Err((
                StatusCode::BAD_REQUEST,
                "User with this email already exists.".into(),
            ));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    let slug = slugify(name);

    let user = match User::create(&state.db, name, &payload.email, &hash, &slug).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.id, &user.name, &user.email)
        .map_err(internal)?;

    // Bookkeeping record of the issued session token
    let expires_at = OffsetDateTime::now_utc()
        + TimeDuration::minutes(state.config.jwt.ttl_minutes);
    if let Err(e) = SessionToken::insert(&state.db, user.id, &token, expires_at).await {
        error!(error = %e, user_id = %user.id, "persist session token failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    let headers = cookie_headers(&state, &token)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), (StatusCode, String)> {
    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login: unknown email");
            return Err((StatusCode::BAD_REQUEST, WRONG_CREDENTIALS.into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user.id, "login: invalid password");
        return Err((StatusCode::BAD_REQUEST, WRONG_CREDENTIALS.into()));
    }

    if let Err(e) = User::set_logged_in(&state.db, user.id, true).await {
        error!(error = %e, user_id = %user.id, "set_logged_in failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.id, &user.name, &user.email)
        .map_err(internal)?;

    let headers = cookie_headers(&state, &token)?;

    let mut public = PublicUser::from(user);
    public.is_logged_in = true;

    info!(user_id = %public.id, email = %public.email, "user logged in");
    Ok((
        headers,
        Json(AuthResponse {
            token,
            user: public,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let user_id = payload
        .user_id
        .ok_or((StatusCode::BAD_REQUEST, "User ID is required.".to_string()))?;

    let found = User::set_logged_in(&state.db, user_id, false)
        .await
        .map_err(internal)?;
    if !found {
        return Err((StatusCode::NOT_FOUND, "User not found.".into()));
    }

    info!(user_id = %user_id, "user logged out");
    Ok(Json(MessageResponse::new("You have been logged out.")))
}

#[instrument(skip(state))]
pub async fn logged_in(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Query(query): Query<LoggedInQuery>,
) -> Result<Json<LoggedInResponse>, (StatusCode, String)> {
    let user_id = query
        .user_id
        .ok_or((StatusCode::BAD_REQUEST, "User ID is required.".to_string()))?;

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found.".to_string()))?;

    Ok(Json(LoggedInResponse {
        logged_in: user.is_logged_in,
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "profile: user not found");
            (StatusCode::NOT_FOUND, "User not found.".to_string())
        })?;

    Ok(Json(Profile::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileTokenResponse>, (StatusCode, String)> {
    if let Some(name) = payload.name.as_deref() {
        let name = name.trim();
        if name.len() < 2 || name.len() > 25 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Name must be between 2 and 25 characters".into(),
            ));
        }
    }
    if let Some(email) = payload.email.as_deref() {
        if !services::is_valid_email(email) {
            return Err((
                StatusCode::BAD_REQUEST,
                "Email address is invalid".into(),
            ));
        }
    }
    if let Some(bio) = payload.bio.as_deref() {
        if bio.len() > 250 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Bio should not be more than 250 characters long.".into(),
            ));
        }
    }

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found.".to_string()))?;

    // Provided fields win, everything else keeps its stored value
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .unwrap_or(user.name);
    let email = payload.email.unwrap_or(user.email);
    let photo = payload.photo.unwrap_or(user.photo);
    let phone = payload.phone.unwrap_or(user.phone);
    let bio = payload.bio.unwrap_or(user.bio);

    let updated = match User::update_profile(&state.db, user_id, &name, &email, &photo, &phone, &bio)
        .await
    {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, user_id = %user_id, "update_profile failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    // Re-sign so the session snapshot reflects the new profile
    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(updated.id, &updated.name, &updated.email)
        .map_err(internal)?;

    info!(user_id = %user_id, "profile updated");
    Ok(Json(ProfileTokenResponse {
        token,
        user: Profile::from(updated),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if payload.password.len() < 6 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password should be at least 6 characters long".into(),
        ));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found.".to_string()))?;

    let ok = verify_password(&payload.old_password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user_id, "change_password: old password mismatch");
        return Err((
            StatusCode::BAD_REQUEST,
            "The password you entered does not match your current password.".into(),
        ));
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    User::update_password(&state.db, user_id, &hash)
        .await
        .map_err(internal)?;

    info!(user_id = %user_id, "password changed");
    Ok(Json(MessageResponse::new("Password has been changed.")))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "forgot_password: unknown email");
            (StatusCode::NOT_FOUND, "The user does not exist.".to_string())
        })?;

    // At most one live reset token per user
    ResetToken::delete_for_user(&state.db, user.id)
        .await
        .map_err(internal)?;

    let (raw_token, token_hash) = services::new_reset_token(user.id);
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::minutes(state.config.reset_ttl_minutes);
    ResetToken::insert(&state.db, user.id, &token_hash, expires_at)
        .await
        .map_err(internal)?;

    // The emailed link carries the raw value; only its digest is stored
    let reset_url = format!("{}/reset-password/{}", state.config.client_origin, raw_token);
    let body = services::reset_email_body(&user.name, &reset_url, state.config.reset_ttl_minutes);

    if let Err(e) = state.mailer.send(&user.email, "Password Reset", &body).await {
        error!(error = %e, user_id = %user.id, "reset email failed");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Email was not sent: {e}"),
        ));
    }

    info!(user_id = %user.id, "reset email sent");
    Ok(Json(MessageResponse::new("Email has been sent.")))
}

#[instrument(skip(state, payload, reset_token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if payload.password.len() < 6 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password should be at least 6 characters long".into(),
        ));
    }

    let token_hash = services::hash_reset_token(&reset_token);
    let token = ResetToken::find_valid(&state.db, &token_hash, OffsetDateTime::now_utc())
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!("reset_password: invalid or expired token");
            (
                StatusCode::NOT_FOUND,
                "The token is invalid or has expired.".to_string(),
            )
        })?;

    let hash = hash_password(&payload.password).map_err(internal)?;
    let found = User::update_password(&state.db, token.user_id, &hash)
        .await
        .map_err(internal)?;
    if !found {
        return Err((StatusCode::NOT_FOUND, "User not found.".into()));
    }

    // Single use: consumed on success
    ResetToken::delete(&state.db, token.id)
        .await
        .map_err(internal)?;

    info!(user_id = %token.user_id, "password reset");
    Ok(Json(MessageResponse::new(
        "Password has been reset. You can now log in.",
    )))
}

fn cookie_headers(state: &AppState, token: &str) -> Result<HeaderMap, (StatusCode, String)> {
    let cookie = services::session_cookie(token, state.config.jwt.ttl_minutes);
    let value = HeaderValue::from_str(&cookie).map_err(internal)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
