//! Registration and OTP verification handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use tourline_core::{Email, UserId};

use crate::error::Result;
use crate::services::OtpLedger;
use crate::state::AppState;

/// Request body for registration and OTP resend.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    /// Account email address.
    pub email: String,
}

/// Response body for registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The new account's ID.
    pub user_id: UserId,
}

/// Request body for OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Account email address.
    pub email: String,
    /// The 6-digit code from the verification email.
    pub code: String,
}

/// Response body for OTP verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Whether the account email is now verified.
    pub verified: bool,
}

/// Register a new account and send a verification code.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let email = Email::parse(&req.email)?;
    let user = state.store().create_user(&email).await?;

    let ledger = OtpLedger::new(state.store(), state.notifier());
    ledger.generate(&email).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id: user.id })))
}

/// Issue a fresh verification code for an email address.
///
/// Prior outstanding codes stay redeemable.
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<StatusCode> {
    let email = Email::parse(&req.email)?;
    let ledger = OtpLedger::new(state.store(), state.notifier());
    ledger.generate(&email).await?;
    Ok(StatusCode::OK)
}

/// Redeem a verification code and mark the account verified.
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let email = Email::parse(&req.email)?;
    let ledger = OtpLedger::new(state.store(), state.notifier());
    ledger.verify(&email, &req.code).await?;

    // Redemption succeeded: flip the account flag. It never reverts.
    state.store().mark_otp_verified(&email).await?;

    Ok(Json(VerifyResponse { verified: true }))
}
