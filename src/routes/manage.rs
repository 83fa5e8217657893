//! Staff back-office: a JSON API for rooms, amenities and room images.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::booking;
use crate::catalog::{self, RoomInput};
use crate::db::models::{Amenity, Booking, Room, RoomImage};
use crate::error::{AppError, AppResult};
use crate::extractors::StaffUser;
use crate::state::AppState;
use crate::storage::{self, StorageError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/manage/rooms", post(create_room))
        .route("/manage/rooms/{id}", put(update_room).delete(delete_room))
        .route("/manage/rooms/{id}/amenities", put(set_amenities))
        .route("/manage/rooms/{id}/images", post(upload_image))
        .route("/manage/rooms/{id}/bookings", get(room_bookings))
        .route("/manage/amenities", post(create_amenity))
        .route("/manage/amenities/{id}", delete(delete_amenity))
        .route("/manage/images/{id}/primary", post(set_primary))
        .route("/manage/images/{id}", delete(delete_image))
}

#[derive(Deserialize)]
pub struct AmenityBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct AmenityIds {
    pub amenity_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct ImageBody {
    #[serde(flatten)]
    pub image: RoomImage,
    pub url: String,
}

fn image_body(state: &AppState, image: RoomImage) -> ImageBody {
    ImageBody {
        url: state.storage.url(&image.file_path),
        image,
    }
}

/// Remove a stored file, logging instead of failing when it is already gone.
async fn remove_file(state: &AppState, path: &str) {
    match state.storage.delete(path).await {
        Ok(()) | Err(StorageError::NotFound(_)) => {}
        Err(e) => tracing::warn!(path, "Could not delete stored file: {}", e),
    }
}

// --- Rooms ---

async fn create_room(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(input): Json<RoomInput>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = {
        let conn = state.db.get()?;
        catalog::create_room(&conn, &input)?
    };
    tracing::info!(room_id = %room.id, staff = %staff.id, "Room created");
    Ok((StatusCode::CREATED, Json(room)))
}

async fn update_room(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(room_id): Path<String>,
    Json(input): Json<RoomInput>,
) -> AppResult<Json<Room>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::update_room(&conn, &room_id, &input)?))
}

async fn delete_room(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(room_id): Path<String>,
) -> AppResult<StatusCode> {
    let paths = {
        let conn = state.db.get()?;
        catalog::delete_room(&conn, &room_id)?
    };
    for path in &paths {
        remove_file(&state, path).await;
    }
    tracing::info!(room_id = %room_id, staff = %staff.id, "Room deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_amenities(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(room_id): Path<String>,
    Json(body): Json<AmenityIds>,
) -> AppResult<Json<Vec<Amenity>>> {
    let mut conn = state.db.get()?;
    Ok(Json(catalog::set_room_amenities(
        &mut conn,
        &room_id,
        &body.amenity_ids,
    )?))
}

async fn room_bookings(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(room_id): Path<String>,
) -> AppResult<Json<Vec<Booking>>> {
    let conn = state.db.get()?;
    catalog::get_room(&conn, &room_id)?.ok_or(AppError::NotFound)?;
    Ok(Json(booking::list_for_room(&conn, &room_id)?))
}

// --- Amenities ---

async fn create_amenity(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Json(body): Json<AmenityBody>,
) -> AppResult<(StatusCode, Json<Amenity>)> {
    let conn = state.db.get()?;
    let amenity = catalog::create_amenity(&conn, &body.name)?;
    Ok((StatusCode::CREATED, Json(amenity)))
}

async fn delete_amenity(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(amenity_id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    catalog::delete_amenity(&conn, &amenity_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Images ---

/// Multipart upload with an `image` file field and an optional `caption`.
async fn upload_image(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(room_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    {
        let conn = state.db.get()?;
        catalog::get_room(&conn, &room_id)?.ok_or(AppError::NotFound)?;
    }

    let mut caption = String::new();
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("caption") => {
                caption = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing image file".to_string()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
    }
    let name = storage::room_image_name(&filename)?;
    let stored = state.storage.save(&name, &data).await?;

    let added = {
        let mut conn = state.db.get()?;
        catalog::add_image(&mut conn, &room_id, &stored, caption.trim())
    };
    let image = match added {
        Ok(image) => image,
        Err(e) => {
            remove_file(&state, &stored).await;
            return Err(e.into());
        }
    };
    tracing::info!(room_id = %room_id, image_id = %image.id, "Room image uploaded");

    Ok((StatusCode::CREATED, Json(image_body(&state, image))).into_response())
}

async fn set_primary(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(image_id): Path<String>,
) -> AppResult<Json<ImageBody>> {
    let image = {
        let mut conn = state.db.get()?;
        catalog::set_primary_image(&mut conn, &image_id)?
    };
    Ok(Json(image_body(&state, image)))
}

async fn delete_image(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(image_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let image = {
        let mut conn = state.db.get()?;
        catalog::delete_image(&mut conn, &image_id)?
    };
    remove_file(&state, &image.file_path).await;
    Ok(Json(json!({ "deleted": image.id })))
}
