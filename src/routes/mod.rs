pub mod assets;
pub mod auth;
pub mod bookings;
pub mod home;
pub mod manage;
pub mod media;
pub mod profile;
pub mod rooms;

use axum::routing::get;
use axum::Router;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

use crate::catalog;
use crate::db::models::Room;
use crate::extractors::CurrentUser;
use crate::flash::{Flash, Flashes};
use crate::state::AppState;
use crate::storage::StorageBackend;

/// The whole site.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .route("/media/{*path}", get(media::serve))
        .merge(rooms::router())
        .merge(bookings::router())
        .merge(auth::router())
        .merge(profile::router())
        .merge(manage::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// What every page shows around its content: the nav bar user and the
/// pending messages.
pub struct Page {
    pub user: Option<CurrentUser>,
    pub messages: Vec<Flash>,
}

impl Page {
    pub fn new(user: Option<CurrentUser>, flashes: &Flashes) -> Self {
        Self {
            user,
            messages: flashes.0.clone(),
        }
    }

    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_staff)
    }
}

/// A room with the URL of its primary image, for listings.
pub struct RoomCard {
    pub room: Room,
    pub image_url: Option<String>,
}

pub fn room_cards(
    conn: &Connection,
    storage: &dyn StorageBackend,
    rooms: Vec<Room>,
) -> rusqlite::Result<Vec<RoomCard>> {
    rooms
        .into_iter()
        .map(|room| {
            let image_url = catalog::primary_image(conn, &room.id)?.map(|i| storage.url(&i.file_path));
            Ok(RoomCard { room, image_url })
        })
        .collect()
}

/// An entry of a `<select>` or a checkbox group.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Only same-site paths are followed after login. Browsers read a backslash
/// as a slash, so any backslash is refused.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
