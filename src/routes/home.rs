use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::catalog::{self, RoomFilter};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::flash::{self, Flashes};
use crate::routes::{room_cards, Page, RoomCard};
use crate::state::AppState;

const FEATURED_ROOMS: usize = 3;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub featured: Vec<RoomCard>,
    pub today: String,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let featured = {
        let conn = state.db.get()?;
        let mut rooms = catalog::list_rooms(&conn, &RoomFilter::default())?;
        rooms.truncate(FEATURED_ROOMS);
        room_cards(&conn, state.storage.as_ref(), rooms)?
    };

    let page = HomeTemplate {
        page: Page::new(user, &flashes),
        featured,
        today: Utc::now().date_naive().to_string(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}
