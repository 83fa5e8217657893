use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::accounts::{self, session, AccountError};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::flash::{self, Flash, Flashes};
use crate::forms::{LoginForm, RegisterForm};
use crate::routes::home::Html;
use crate::routes::{safe_next, Page};
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub email: String,
    pub username: String,
    pub errors: Vec<String>,
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/register", get(register_page).post(register))
}

/// Start a session for `user` and redirect to `to`.
fn sign_in(state: &AppState, user: &User, to: &str, flashes: &[Flash]) -> AppResult<Response> {
    let token = {
        let conn = state.db.get()?;
        session::create_session(&conn, &user.id, state.config.auth.session_hours)?
    };
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    tracing::info!(user_id = %user.id, "Signed in");

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        flash::redirect_with(to, flashes),
    )
        .into_response())
}

// -- Login --

async fn login_page(
    MaybeUser(user): MaybeUser,
    flashes: Flashes,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if user.is_some() {
        return Redirect::to(&next).into_response();
    }

    let page = LoginTemplate {
        page: Page::new(None, &flashes),
        email: String::new(),
        next,
        error: None,
    };
    flash::consume(&flashes, Html(page))
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Response> {
    let user = {
        let conn = state.db.get()?;
        accounts::authenticate(&conn, &form.email, &form.password)?
    };
    let next = safe_next(form.next.as_deref());

    match user {
        Some(user) => sign_in(
            &state,
            &user,
            &next,
            &[Flash::success(format!("Welcome back, {}!", user.username))],
        ),
        None => Ok(Html(LoginTemplate {
            page: Page::new(None, &Flashes::default()),
            email: form.email,
            next,
            error: Some("Invalid email or password.".to_string()),
        })
        .into_response()),
    }
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = session::cookie_value(&headers, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }
    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "Signed out");
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, session::clear_cookie(cookie_name))]),
        flash::redirect_with("/", &[Flash::success("You have been logged out.")]),
    )
        .into_response())
}

// -- Registration --

async fn register_page(MaybeUser(user): MaybeUser, flashes: Flashes) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let page = RegisterTemplate {
        page: Page::new(None, &flashes),
        email: String::new(),
        username: String::new(),
        errors: Vec::new(),
    };
    flash::consume(&flashes, Html(page))
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let created = {
        let mut conn = state.db.get()?;
        accounts::register(&mut conn, &form)
    };

    match created {
        Ok(user) => sign_in(&state, &user, "/", &[Flash::success("Registration successful.")]),
        Err(e) if e.is_user_facing() => Ok(Html(RegisterTemplate {
            page: Page::new(None, &Flashes::default()),
            email: form.email,
            username: form.username,
            errors: vec![e.to_string()],
        })
        .into_response()),
        Err(AccountError::Database(e)) => Err(AppError::Database(e)),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}
