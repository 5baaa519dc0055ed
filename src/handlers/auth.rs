use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::google::{issue_state, verify_state, GoogleProfile};
use crate::auth::jwt::create_access_token;
use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::user::User;
use crate::AppState;

const STATE_COOKIE: &str = "oauth_state";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/auth/google: start the consent flow.
pub async fn google_login(State(state): State<AppState>, jar: CookieJar) -> AppResult<Response> {
    if !state.google.is_configured() {
        return Err(AppError::Upstream("Google OAuth is not configured".into()));
    }

    let oauth_state = issue_state(&state.config.jwt_secret)?;
    let url = state.google.authorize_url(&oauth_state)?;

    let cookie = state_cookie(oauth_state, state.config.secure_cookies());
    Ok((jar.add(cookie), Redirect::to(&url)).into_response())
}

/// `Secure` only when the callback is https, so local sign-in over http works.
fn state_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// GET /api/auth/google/callback: finish the flow and hand the token to the
/// opener window.
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let outcome = complete_sign_in(&state, &jar, query).await;
    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/api/auth"));

    match outcome {
        Ok(token) => {
            let page = callback_page(&state.config.frontend_url, Ok(&token));
            (jar, Html(page)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in failed");
            let page = callback_page(&state.config.frontend_url, Err("Authentication failed"));
            (e.status(), jar, Html(page)).into_response()
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    jar: &CookieJar,
    query: CallbackQuery,
) -> AppResult<String> {
    if let Some(error) = query.error {
        return Err(AppError::Upstream(format!("Consent denied: {}", error)));
    }
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".into()))?;
    let returned_state = query
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state".into()))?;

    let cookie_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if cookie_state.as_deref() != Some(returned_state.as_str())
        || !verify_state(&returned_state, &state.config.jwt_secret)
    {
        return Err(AppError::BadRequest("OAuth state mismatch".into()));
    }

    let token = state.google.exchange_code(&code).await?;
    tracing::debug!(expires_in = ?token.expires_in, "Google token received");
    let profile = state.google.fetch_profile(&token.access_token).await?;

    let user = upsert_user(&state.db, &profile).await?;
    tracing::info!(
        user_id = %user.id,
        google_linked = user.google_id.is_some(),
        "User signed in with Google"
    );

    create_access_token(&user, &state.config)
}

async fn upsert_user(db: &sqlx::PgPool, profile: &GoogleProfile) -> AppResult<User> {
    let email = profile
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Upstream("No email found in Google profile".into()))?;
    if profile.email_verified == Some(false) {
        return Err(AppError::Forbidden);
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, google_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET
            name = EXCLUDED.name,
            google_id = COALESCE(users.google_id, EXCLUDED.google_id)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(profile.display_name(email))
    .bind(&profile.sub)
    .fetch_one(db)
    .await?;

    Ok(user)
}

/// JSON string literal safe to embed inside a `<script>` element.
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".into())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

/// Page that posts `{token}` or `{error}` to `window.opener` and closes.
pub fn callback_page(client_origin: &str, outcome: Result<&str, &str>) -> String {
    let message = match outcome {
        Ok(token) => format!("{{ token: {} }}", js_string(token)),
        Err(error) => format!("{{ error: {} }}", js_string(error)),
    };
    let heading = if outcome.is_ok() {
        "Authentication successful"
    } else {
        "Authentication failed"
    };

    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>{heading}</title></head>
  <body>
    <p id="status">{heading}. Closing window...</p>
    <script>
      if (window.opener) {{
        window.opener.postMessage({message}, {origin});
        window.close();
      }} else {{
        document.getElementById('status').textContent = 'Please close this window and try again.';
      }}
    </script>
  </body>
</html>"#,
        heading = heading,
        message = message,
        origin = js_string(client_origin),
    )
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user))
}
