use std::str::FromStr;

use askama::Template;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::booking::{self, StayDates};
use crate::catalog::{self, RoomFilter};
use crate::db::models::{format_money, Amenity, Room, RoomType};
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::flash::{self, Flash, Flashes};
use crate::forms::{parse_date, DateQuery};
use crate::routes::home::Html;
use crate::routes::{room_cards, Page, RoomCard, SelectOption};
use crate::state::AppState;

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/rooms.html")]
pub struct RoomListTemplate {
    pub page: Page,
    pub rooms: Vec<RoomCard>,
    pub room_types: Vec<SelectOption>,
    pub amenities: Vec<SelectOption>,
    pub check_in: String,
    pub check_out: String,
    pub max_price: String,
    /// Query string carried into the booking links
    pub dates_query: String,
    pub errors: Vec<String>,
    pub today: String,
}

pub struct ImageView {
    pub url: String,
    pub caption: String,
    pub is_primary: bool,
}

#[derive(Template)]
#[template(path = "pages/room_detail.html")]
pub struct RoomDetailTemplate {
    pub page: Page,
    pub room: Room,
    pub amenities: Vec<Amenity>,
    pub images: Vec<ImageView>,
    pub check_in: String,
    pub check_out: String,
    pub today: String,
}

#[derive(Template)]
#[template(path = "pages/available_rooms.html")]
pub struct AvailableRoomsTemplate {
    pub page: Page,
    pub rooms: Vec<RoomCard>,
    pub check_in: String,
    pub check_out: String,
    pub nights: i64,
    pub dates_query: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(room_list))
        .route("/rooms/{id}", get(room_detail))
        .route("/rooms/{id}/json", get(room_json))
        .route("/rooms/{id}/availability", get(room_availability))
        .route("/availability", get(available_rooms))
}

// --- Search parameters ---

/// `/rooms` query. `amenities` may repeat, so this is parsed from the raw
/// query string rather than through `Query`.
#[derive(Debug, Default, PartialEq)]
pub struct SearchParams {
    pub check_in: String,
    pub check_out: String,
    pub room_type: String,
    pub max_price: String,
    pub amenities: Vec<String>,
}

impl SearchParams {
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = SearchParams::default();
        let Some(query) = query else {
            return params;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim().to_string();
            match key.as_ref() {
                "check_in" => params.check_in = value,
                "check_out" => params.check_out = value,
                "room_type" => params.room_type = value,
                "max_price" => params.max_price = value,
                "amenities" if !value.is_empty() => params.amenities.push(value),
                _ => {}
            }
        }
        params
    }

    /// The listing filter, plus messages for the parameters that were
    /// ignored because they did not parse.
    pub fn filter(&self) -> (RoomFilter, Vec<String>) {
        let mut errors = Vec::new();
        let mut filter = RoomFilter {
            amenity_ids: self.amenities.clone(),
            ..RoomFilter::default()
        };

        if !self.check_in.is_empty() && !self.check_out.is_empty() {
            let stay = parse_date(&self.check_in, "check-in")
                .and_then(|a| parse_date(&self.check_out, "check-out").map(|b| (a, b)))
                .and_then(|(a, b)| StayDates::unchecked(a, b).map_err(|e| e.to_string()));
            match stay {
                Ok(stay) => filter.stay = Some(stay),
                Err(msg) => errors.push(msg),
            }
        }

        if !self.room_type.is_empty() {
            match RoomType::from_str(&self.room_type) {
                Ok(room_type) => filter.room_type = Some(room_type),
                Err(_) => errors.push("Unknown room type".to_string()),
            }
        }

        if !self.max_price.is_empty() {
            match Decimal::from_str(&self.max_price) {
                Ok(price) if price >= Decimal::ZERO => filter.max_price = Some(price),
                _ => errors.push("Enter a valid maximum price".to_string()),
            }
        }

        (filter, errors)
    }
}

fn dates_query(check_in: &str, check_out: &str) -> String {
    if check_in.is_empty() || check_out.is_empty() {
        return String::new();
    }
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("check_in", check_in)
        .append_pair("check_out", check_out)
        .finish()
}

// --- Handlers ---

async fn room_list(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flashes: Flashes,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let params = SearchParams::parse(query.as_deref());
    let (filter, errors) = params.filter();

    let (rooms, amenities) = {
        let conn = state.db.get()?;
        let rooms = catalog::list_rooms(&conn, &filter)?;
        (
            room_cards(&conn, state.storage.as_ref(), rooms)?,
            catalog::list_amenities(&conn)?,
        )
    };

    let room_types = RoomType::ALL
        .iter()
        .map(|t| SelectOption {
            value: t.code().to_string(),
            label: t.label().to_string(),
            selected: params.room_type == t.code(),
        })
        .collect();
    let amenities = amenities
        .into_iter()
        .map(|a| SelectOption {
            selected: params.amenities.contains(&a.id),
            value: a.id,
            label: a.name,
        })
        .collect();

    let page = RoomListTemplate {
        page: Page::new(user, &flashes),
        rooms,
        room_types,
        amenities,
        dates_query: dates_query(&params.check_in, &params.check_out),
        check_in: params.check_in,
        check_out: params.check_out,
        max_price: params.max_price,
        errors,
        today: Utc::now().date_naive().to_string(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}

async fn room_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flashes: Flashes,
    Path(id): Path<String>,
    Query(dates): Query<DateQuery>,
) -> AppResult<Response> {
    let detail = {
        let conn = state.db.get()?;
        catalog::room_detail(&conn, &id)?.ok_or(AppError::NotFound)?
    };

    let images = detail
        .images
        .into_iter()
        .map(|image| ImageView {
            url: state.storage.url(&image.file_path),
            caption: image.caption,
            is_primary: image.is_primary,
        })
        .collect();

    let page = RoomDetailTemplate {
        page: Page::new(user, &flashes),
        room: detail.room,
        amenities: detail.amenities,
        images,
        check_in: dates.check_in.unwrap_or_default(),
        check_out: dates.check_out.unwrap_or_default(),
        today: Utc::now().date_naive().to_string(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}

async fn room_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let detail = {
        let conn = state.db.get()?;
        catalog::room_detail(&conn, &id)?.ok_or(AppError::NotFound)?
    };
    let room = detail.room;

    Ok(Json(json!({
        "id": room.id,
        "name": room.name,
        "description": room.description,
        "room_type": room.room_type.label(),
        "room_type_code": room.room_type.code(),
        "price": room.price_display(),
        "available": room.available,
        "max_occupancy": room.max_occupancy,
        "size": room.size,
        "images": detail
            .images
            .iter()
            .map(|i| state.storage.url(&i.file_path))
            .collect::<Vec<_>>(),
        "amenities": detail.amenities.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
    })))
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn room_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(dates): Query<DateQuery>,
) -> AppResult<Response> {
    let (check_in, check_out) = match dates.dates() {
        Some(Ok(dates)) => dates,
        Some(Err(msg)) => return Ok(json_error(StatusCode::BAD_REQUEST, msg)),
        None => {
            return Ok(json_error(
                StatusCode::BAD_REQUEST,
                "check_in and check_out are required",
            ))
        }
    };
    let stay = match StayDates::new(check_in, check_out, Utc::now().date_naive()) {
        Ok(stay) => stay,
        Err(e) => return Ok(json_error(StatusCode::BAD_REQUEST, e.to_string())),
    };

    let conn = state.db.get()?;
    let room = catalog::get_room(&conn, &id)?.ok_or(AppError::NotFound)?;
    let available = room.available && booking::is_room_available(&conn, &room.id, &stay, None)?;

    Ok(Json(json!({
        "available": available,
        "nights": stay.nights(),
        "total_price": format_money(booking::total_price(room.price, &stay)),
    }))
    .into_response())
}

async fn available_rooms(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flashes: Flashes,
    Query(dates): Query<DateQuery>,
) -> AppResult<Response> {
    let stay = match dates.dates() {
        None => return Ok(Redirect::to("/rooms").into_response()),
        Some(Err(msg)) => return Ok(flash::redirect_with("/rooms", &[Flash::error(msg)])),
        Some(Ok((check_in, check_out))) => stay_or_redirect(check_in, check_out),
    };
    let stay = match stay {
        Ok(stay) => stay,
        Err(response) => return Ok(response),
    };

    let rooms = {
        let conn = state.db.get()?;
        let filter = RoomFilter {
            stay: Some(stay),
            ..RoomFilter::default()
        };
        let rooms = catalog::list_rooms(&conn, &filter)?;
        room_cards(&conn, state.storage.as_ref(), rooms)?
    };

    let check_in = stay.check_in().to_string();
    let check_out = stay.check_out().to_string();
    let page = AvailableRoomsTemplate {
        page: Page::new(user, &flashes),
        rooms,
        dates_query: dates_query(&check_in, &check_out),
        check_in,
        check_out,
        nights: stay.nights(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}

fn stay_or_redirect(check_in: NaiveDate, check_out: NaiveDate) -> Result<StayDates, Response> {
    StayDates::unchecked(check_in, check_out)
        .map_err(|e| flash::redirect_with("/rooms", &[Flash::error(e.to_string())]))
}
