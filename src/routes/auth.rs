use crate::{
    auth::{
        AccessAuthority, AuthResponse, AuthenticatedUser, ChangePasswordRequest, LoginRequest,
        LoginResponse, RegisterRequest,
    },
    error::AppError,
    models::Identity,
};
use actix_web::{get, http::header, post, put, routes, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use validator::Validate;

/// Register a new user
///
/// Creates a new account and returns a session token for it. Also served as `/signup`,
/// the path the web client posts to.
///
/// ## Responses:
/// - `201 Created`: `{token, userId}`.
/// - `400 Bad Request`: The email is already registered, or a field is missing.
/// - `422 Unprocessable Entity`: A field fails validation.
/// - `503 Service Unavailable`: The identity store did not respond.
#[routes]
#[post("/register")]
#[post("/signup")]
pub async fn register(
    authority: web::Data<AccessAuthority>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let register_data = register_data.into_inner();

    let identity = authority
        .register(
            &register_data.email,
            &register_data.password,
            register_data.first_name,
            register_data.last_name,
        )
        .await?;

    let token = authority.issue_session(&identity, Utc::now())?;

    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        user_id: identity.id,
    }))
}

/// Login user
///
/// Authenticates an email/password pair and returns a session token with the profile.
/// The email is matched case-insensitively.
///
/// ## Responses:
/// - `200 OK`: `{token, userId, email, first_name, last_name}`.
/// - `401 Unauthorized`: Unknown email or wrong password (not distinguished).
/// - `503 Service Unavailable`: The identity store did not respond.
#[post("/login")]
pub async fn login(
    authority: web::Data<AccessAuthority>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let identity = authority
        .authenticate(&login_data.email, &login_data.password)
        .await?;
    let token = authority.issue_session(&identity, Utc::now())?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user_id: identity.id,
        email: identity.email,
        first_name: identity.first_name,
        last_name: identity.last_name,
    }))
}

/// Get user details
///
/// The bearer token must have been issued to `user_id`; any other token is rejected
/// with `401`, even if it is otherwise valid.
#[get("/user/{user_id}")]
pub async fn get_user(
    authority: web::Data<AccessAuthority>,
    user_id: web::Path<String>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let principal = authority
        .authorize_subject(token.trim(), &user_id, Utc::now())
        .await?;
    let identity: Identity = authority.identity_of(&principal).await?;

    Ok(HttpResponse::Ok().json(identity))
}

/// Change password
///
/// Requires the current password. Sessions issued before the change remain valid until
/// they expire.
#[put("/password")]
pub async fn change_password(
    authority: web::Data<AccessAuthority>,
    user: AuthenticatedUser,
    body: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    body.validate()?;

    authority
        .change_secret(&user.0, &body.current_password, &body.new_password)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
