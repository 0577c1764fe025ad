use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::{dispatch, session_token, success, ApiJson, AppState, SESSION_COOKIE};
use crate::models::users::{SignInRequest, SignUpRequest, VerifyOtpRequest};
use crate::models::EmailRequest;
use crate::services::auth::AuthRequest;
use crate::services::ServiceError;

fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn expired_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        SESSION_COOKIE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignInRequest>,
) -> Result<Response, ServiceError> {
    let (email, password) = req.validate().map_err(ServiceError::InvalidInput)?;

    let signed_in = dispatch(&state.auth_channel, |response| AuthRequest::SignIn {
        email,
        password,
        response,
    })
    .await?;

    let cookie = session_cookie(&signed_in.token, state.keys.ttl_seconds(), state.secure_cookie);
    Ok((
        [(header::SET_COOKIE, cookie)],
        success(StatusCode::OK, Some("Signed in"), signed_in),
    )
        .into_response())
}

pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let token = session_token(&headers);
    dispatch(&state.auth_channel, |response| AuthRequest::SignOut { token, response }).await?;

    Ok((
        [(header::SET_COOKIE, expired_cookie(state.secure_cookie))],
        success(StatusCode::OK, Some("Signed out"), ()),
    )
        .into_response())
}

pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignUpRequest>,
) -> Result<Response, ServiceError> {
    let sign_up = req.validate().map_err(ServiceError::InvalidInput)?;

    let pending = dispatch(&state.auth_channel, |response| AuthRequest::SignUp {
        sign_up,
        response,
    })
    .await?;

    Ok(success(
        StatusCode::OK,
        Some("OTP sent to your email"),
        pending,
    ))
}

pub async fn send_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Response, ServiceError> {
    let email = req.validate().map_err(ServiceError::InvalidInput)?;

    let issued = dispatch(&state.auth_channel, |response| AuthRequest::SendOtp {
        email,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, Some("OTP sent"), issued))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyOtpRequest>,
) -> Result<Response, ServiceError> {
    let (email, otp) = req.validate().map_err(ServiceError::InvalidInput)?;

    let profile = dispatch(&state.auth_channel, |response| AuthRequest::VerifyOtp {
        email,
        otp,
        response,
    })
    .await?;

    Ok(success(StatusCode::CREATED, Some("Account created"), profile))
}
