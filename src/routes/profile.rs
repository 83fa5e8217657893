use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use chrono::Utc;

use crate::accounts::{self, AccountError};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::flash::{self, Flash, Flashes};
use crate::forms::ProfileForm;
use crate::routes::home::Html;
use crate::routes::Page;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub page: Page,
    pub form: ProfileForm,
    pub errors: Vec<String>,
    pub today: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(profile_page).post(update_profile))
}

async fn profile_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let profile = {
        let conn = state.db.get()?;
        accounts::get_profile(&conn, &user.id)?
    };

    let form = ProfileForm {
        phone_number: profile.phone_number.unwrap_or_default(),
        address: profile.address.unwrap_or_default(),
        date_of_birth: profile
            .date_of_birth
            .map(|d| d.to_string())
            .unwrap_or_default(),
    };
    let page = ProfileTemplate {
        page: Page::new(Some(user), &flashes),
        form,
        errors: Vec::new(),
        today: Utc::now().date_naive().to_string(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}

async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let today = Utc::now().date_naive();
    let result = {
        let conn = state.db.get()?;
        accounts::update_profile(&conn, &user.id, &form, today)
    };

    match result {
        Ok(_) => Ok(flash::redirect_with(
            "/profile",
            &[Flash::success("Your profile has been updated.")],
        )),
        Err(e) if e.is_user_facing() => Ok(Html(ProfileTemplate {
            page: Page::new(Some(user), &Flashes::default()),
            form,
            errors: vec![e.to_string()],
            today: today.to_string(),
        })
        .into_response()),
        Err(AccountError::Database(e)) => Err(AppError::Database(e)),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}
