use actix_identity::Identity;
use actix_session::Session;
use actix_web::{get, post, web, HttpMessage, HttpRequest, Responder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{base_context, html, render, see_other, tenant, GENERIC_FAILURE};
use crate::{
    api::record,
    auth::{flash_error, flash_success, session_user, SessionUser, USER_KEY},
    errors::AppError,
    AppState,
};

#[get("/login")]
pub async fn login_handler(
    req: HttpRequest,
    session: Session,
    identity: Option<Identity>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    if identity.is_some() && session_user(&session).is_some() {
        return Ok(see_other("/"));
    }

    let tenant = tenant(&req, &state, &session, None);
    let mut context = base_context(&tenant, &session, None);
    context.insert("title", "Login");

    Ok(html(render("login.html", &context)?))
}

#[derive(Deserialize)]
pub struct Login {
    email: String,
    password: String,
}

/// Build the session user from the backend's `{token, user}` login answer.
fn session_user_from_login(response: Value) -> Option<SessionUser> {
    let response = record(response);
    let token = response.get("token")?.as_str()?.to_string();
    let mut user = response.get("user")?.clone();
    user.as_object_mut()?
        .insert("token".to_string(), Value::String(token));
    serde_json::from_value(user).ok()
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<Login>,
    req: HttpRequest,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        flash_error(&session, "Email and password are required");
        return Ok(see_other("/login"));
    }
    if !email.contains('@') {
        flash_error(&session, "Invalid email address");
        return Ok(see_other("/login"));
    }

    let mut tenant = tenant(&req, &state, &session, None);
    // login is not scoped to an entity
    tenant.ctx.entity = None;
    let response = match state
        .backend
        .post(
            &tenant.ctx,
            "auth/login",
            json!({"email": email, "password": form.password}),
        )
        .await
    {
        Ok(response) => response,
        Err(e) if e.is_auth_rejection() => {
            log::info!("Login rejected for {}", email);
            flash_error(&session, "Invalid email or password");
            return Ok(see_other("/login"));
        }
        Err(e) => {
            log::error!("Login request failed: {}", e);
            flash_error(&session, GENERIC_FAILURE);
            return Ok(see_other("/login"));
        }
    };

    let Some(user) = session_user_from_login(response) else {
        log::error!("Login response for {} is missing token or user", email);
        flash_error(&session, GENERIC_FAILURE);
        return Ok(see_other("/login"));
    };

    Identity::login(&req.extensions(), user.id.clone())
        .map_err(|e| AppError::IdentityError(e.to_string()))?;
    session.insert(USER_KEY, &user)?;
    flash_success(&session, &format!("Welcome, {}", user.name));
    log::info!("User {} logged in", user.id);

    Ok(see_other("/"))
}

#[post("/logout")]
pub async fn logout_handler(identity: Option<Identity>, session: Session) -> impl Responder {
    match identity {
        // purges the whole session, selected entity included
        Some(identity) => identity.logout(),
        None => session.purge(),
    }
    see_other("/login")
}
