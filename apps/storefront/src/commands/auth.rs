//! # Auth Commands
//!
//! Sign-up, sign-in, demo sign-in and sign-out.
//!
//! ## Session Lifecycle
//! ```text
//! ┌──────────────┐  sign_up / sign_in   ┌──────────────┐
//! │  signed out  │ ───────────────────► │  signed in   │──┐ current_session()
//! │              │ ◄─────────────────── │ (JWT, stored)│◄─┘ validates the token
//! └──────────────┘  sign_out / expiry   └──────────────┘
//!        │                                     ▲
//!        └──── sign_in_mock (if enabled) ──────┘  is_mock = true, no token check
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{hash_secret, verify_secret, AuthError, JwtManager};
use crate::config::StorefrontConfig;
use crate::error::ApiError;
use crate::state::{DbState, SessionStore};
use souq_core::validation::{validate_email, validate_password, validate_required};
use souq_core::{AccountType, ResellerPlan, Session, UserProfile};
use souq_db::NewUser;

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub account_type: AccountType,
    pub reseller_plan: Option<ResellerPlan>,
}

/// Sign-in form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Demo sign-in form. Nothing is checked against the database.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSignInRequest {
    pub email: String,
    #[serde(default)]
    pub account_type: AccountType,
    pub reseller_plan: Option<ResellerPlan>,
}

/// Session info returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
}

/// Creates an account and signs it in.
///
/// ## Behavior
/// - Email is normalized to lowercase
/// - Admin accounts cannot be self-registered
/// - Resellers without a plan start on `basic`; customers never carry one
///
/// ## Errors
/// - `VALIDATION_ERROR` with the offending field
/// - `CONFLICT` (field `email`) if the email is taken
pub async fn sign_up(
    db: &DbState,
    session: &SessionStore,
    jwt: &JwtManager,
    request: SignUpRequest,
) -> Result<SessionResponse, ApiError> {
    debug!(email = %request.email, account_type = %request.account_type, "sign_up command");

    validate_email(&request.email)?;
    validate_password(&request.password)?;
    validate_required("full_name", &request.full_name, 120)?;

    let reseller_plan = match request.account_type {
        AccountType::Admin => {
            return Err(ApiError::forbidden("Admin accounts cannot be self-registered")
                .with_field("account_type"))
        }
        AccountType::Reseller => Some(request.reseller_plan.unwrap_or(ResellerPlan::Basic)),
        AccountType::Customer => None,
    };

    let password_hash = hash_secret(&request.password)?;
    let user = db
        .inner()
        .users()
        .create(&NewUser {
            email: request.email,
            password_hash,
            full_name: request.full_name.trim().to_string(),
            account_type: request.account_type,
            reseller_plan,
        })
        .await?;

    let response = start_session(session, jwt, user).await?;
    info!(user_id = %response.session.user.id, "Account created");
    Ok(response)
}

/// Signs in with email and password.
///
/// ## Errors
/// - `UNAUTHENTICATED` for an unknown email or a wrong password (same message)
/// - `FORBIDDEN` if the account was deactivated
pub async fn sign_in(
    db: &DbState,
    session: &SessionStore,
    jwt: &JwtManager,
    request: SignInRequest,
) -> Result<SessionResponse, ApiError> {
    debug!(email = %request.email, "sign_in command");

    let credentials = db
        .inner()
        .users()
        .get_credentials(&request.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_secret(&request.password, &credentials.password_hash) {
        warn!(user_id = %credentials.profile.id, "Wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }
    if !credentials.profile.is_active {
        return Err(AuthError::AccountDisabled.into());
    }

    let response = start_session(session, jwt, credentials.profile).await?;
    info!(user_id = %response.session.user.id, "Signed in");
    Ok(response)
}

/// Starts a demo session without touching the database.
///
/// Demo sessions can browse and fill the cart but cannot place orders.
/// Only customer and reseller demos exist; admin is refused.
pub async fn sign_in_mock(
    session: &SessionStore,
    config: &StorefrontConfig,
    request: MockSignInRequest,
) -> Result<SessionResponse, ApiError> {
    debug!(email = %request.email, "sign_in_mock command");

    if !config.allow_mock_sessions {
        return Err(AuthError::MockDisabled.into());
    }
    validate_email(&request.email)?;

    let reseller_plan = match request.account_type {
        AccountType::Admin => {
            return Err(ApiError::forbidden("Demo sessions cannot be admins")
                .with_field("account_type"))
        }
        AccountType::Reseller => Some(request.reseller_plan.unwrap_or(ResellerPlan::Basic)),
        AccountType::Customer => None,
    };
    let email = request.email.trim().to_lowercase();
    let now = Utc::now();

    let mock = Session {
        user: UserProfile {
            id: format!("mock-{}", Uuid::new_v4()),
            full_name: email.split('@').next().unwrap_or_default().to_string(),
            email,
            account_type: request.account_type,
            reseller_plan,
            is_active: true,
            created_at: now,
        },
        access_token: "mock-token".to_string(),
        expires_at: now + chrono::Duration::seconds(config.session_ttl_secs),
        is_mock: true,
    };

    session.set(mock.clone()).await;
    info!(user_id = %mock.user.id, account_type = %mock.user.account_type, "Demo session started");
    Ok(SessionResponse { session: mock })
}

pub async fn sign_out(session: &SessionStore) {
    debug!("sign_out command");
    session.clear().await;
    info!("Signed out");
}

/// The current session, if any.
///
/// A real session whose token no longer validates is signed out and
/// reported as `None`.
pub async fn current_session(
    session: &SessionStore,
    jwt: &JwtManager,
) -> Option<SessionResponse> {
    let current = session.current().await?;

    if !current.is_mock {
        if let Err(e) = jwt.validate(&current.access_token) {
            warn!(user_id = %current.user.id, error = %e, "Stored token rejected, signing out");
            session.clear().await;
            return None;
        }
    }

    Some(SessionResponse { session: current })
}

async fn start_session(
    session: &SessionStore,
    jwt: &JwtManager,
    user: UserProfile,
) -> Result<SessionResponse, ApiError> {
    let (access_token, expires_at) = jwt.issue(&user)?;
    let signed_in = Session {
        user,
        access_token,
        expires_at,
        is_mock: false,
    };

    session.set(signed_in.clone()).await;
    Ok(SessionResponse { session: signed_in })
}

// =============================================================================
// Unit Tests
// =============================================================================
