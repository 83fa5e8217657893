use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Utc;
use validator::Validate;

use crate::booking::{
    self, notify, BookingChanges, BookingError, BookingSummary, NewBooking, StayDates,
};
use crate::catalog;
use crate::db::models::{Booking, Room};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::flash::{self, Flash, Flashes};
use crate::forms::{error_messages, BookingForm, DateQuery};
use crate::routes::home::Html;
use crate::routes::Page;
use crate::state::AppState;

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/book.html")]
pub struct BookTemplate {
    pub page: Page,
    pub room: Room,
    pub form: BookingForm,
    pub errors: Vec<String>,
    pub today: String,
}

#[derive(Template)]
#[template(path = "pages/booking_confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: Page,
    pub booking: Booking,
    pub room_name: String,
}

pub struct BookingRow {
    pub summary: BookingSummary,
    pub can_cancel: bool,
}

#[derive(Template)]
#[template(path = "pages/my_bookings.html")]
pub struct MyBookingsTemplate {
    pub page: Page,
    pub bookings: Vec<BookingRow>,
}

#[derive(Template)]
#[template(path = "pages/edit_booking.html")]
pub struct EditBookingTemplate {
    pub page: Page,
    pub booking: Booking,
    pub room_name: String,
    pub form: BookingForm,
    pub errors: Vec<String>,
    pub today: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms/{id}/book", get(book_page).post(book_room))
        .route("/bookings", get(my_bookings))
        .route("/bookings/{id}", get(confirmation))
        .route("/bookings/{id}/edit", get(edit_page).post(edit_booking))
        .route("/bookings/{id}/cancel", post(cancel))
}

/// Validate the form and turn it into guest details and future stay dates.
fn read_form(form: &BookingForm) -> Result<(booking::GuestDetails, StayDates), Vec<String>> {
    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => error_messages(&e),
    };
    let stay = match form.dates() {
        Ok((check_in, check_out)) => {
            StayDates::new(check_in, check_out, Utc::now().date_naive()).map_err(|e| e.to_string())
        }
        Err(msg) => Err(msg),
    };
    match stay {
        Ok(stay) if errors.is_empty() => Ok((form.guest(), stay)),
        Ok(_) => Err(errors),
        Err(msg) => {
            errors.push(msg);
            Err(errors)
        }
    }
}

fn load_room(state: &AppState, room_id: &str) -> AppResult<Room> {
    let conn = state.db.get()?;
    catalog::get_room(&conn, room_id)?.ok_or(AppError::NotFound)
}

// --- Handlers ---

async fn book_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(room_id): Path<String>,
    Query(dates): Query<DateQuery>,
) -> AppResult<Response> {
    let room = load_room(&state, &room_id)?;
    if !room.available {
        return Ok(flash::redirect_with(
            "/rooms",
            &[Flash::error(BookingError::RoomClosed.to_string())],
        ));
    }

    let form = BookingForm {
        guest_name: user.username.clone(),
        email: user.email.clone(),
        phone_number: String::new(),
        check_in: dates.check_in.unwrap_or_default(),
        check_out: dates.check_out.unwrap_or_default(),
    };
    let page = BookTemplate {
        page: Page::new(Some(user), &flashes),
        room,
        form,
        errors: Vec::new(),
        today: Utc::now().date_naive().to_string(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}

async fn book_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(room_id): Path<String>,
    Form(form): Form<BookingForm>,
) -> AppResult<Response> {
    let room = load_room(&state, &room_id)?;

    let rerender = |room: Room, form: BookingForm, errors: Vec<String>, user: CurrentUser| {
        Html(BookTemplate {
            page: Page::new(Some(user), &Flashes::default()),
            room,
            form,
            errors,
            today: Utc::now().date_naive().to_string(),
        })
        .into_response()
    };

    let (guest, stay) = match read_form(&form) {
        Ok(parts) => parts,
        Err(errors) => return Ok(rerender(room, form, errors, user)),
    };

    let created = {
        let mut conn = state.db.get()?;
        booking::create_booking(
            &mut conn,
            NewBooking {
                room_id: room.id.clone(),
                user_id: Some(user.id.clone()),
                guest,
                stay,
            },
        )
    };
    let saved = match created {
        Ok(saved) => saved,
        Err(BookingError::RoomNotFound) => return Err(AppError::NotFound),
        Err(e) if e.is_user_facing() => {
            return Ok(rerender(room, form, vec![e.to_string()], user))
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let mut flashes = vec![Flash::success("Booking confirmed successfully")];
    if let Err(e) = notify::send_confirmation(state.mailer.as_ref(), &saved, &room.name).await {
        flashes.push(Flash::warning(format!(
            "Booking confirmed, but failed to send email: {}",
            e
        )));
    }

    Ok(flash::redirect_with(
        &format!("/bookings/{}", saved.id),
        &flashes,
    ))
}

async fn my_bookings(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let summaries = {
        let conn = state.db.get()?;
        booking::list_for_user(&conn, &user.id)?
    };

    let check_in_time = state.config.booking.check_in_time();
    let now = Utc::now().naive_utc();
    let bookings = summaries
        .into_iter()
        .map(|summary| BookingRow {
            can_cancel: summary.booking.status.is_active()
                && booking::can_cancel(summary.booking.check_in_date, check_in_time, now),
            summary,
        })
        .collect();

    let page = MyBookingsTemplate {
        page: Page::new(Some(user), &flashes),
        bookings,
    };
    Ok(flash::consume(&flashes, Html(page)))
}

/// A booking the user may see: their own, or any when staff.
fn visible_booking(state: &AppState, user: &CurrentUser, booking_id: &str) -> AppResult<Booking> {
    let conn = state.db.get()?;
    let found = if user.is_staff {
        booking::find_by_id(&conn, booking_id)?
    } else {
        booking::find_for_user(&conn, booking_id, &user.id)?
    };
    found.ok_or(AppError::NotFound)
}

async fn confirmation(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(booking_id): Path<String>,
) -> AppResult<Response> {
    let booking = visible_booking(&state, &user, &booking_id)?;
    let room_name = load_room(&state, &booking.room_id)?.name;

    let page = ConfirmationTemplate {
        page: Page::new(Some(user), &flashes),
        booking,
        room_name,
    };
    Ok(flash::consume(&flashes, Html(page)))
}

async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(booking_id): Path<String>,
) -> AppResult<Response> {
    let booking = {
        let conn = state.db.get()?;
        booking::find_for_user(&conn, &booking_id, &user.id)?.ok_or(AppError::NotFound)?
    };
    if !booking.status.is_active() {
        return Ok(flash::redirect_with(
            "/bookings",
            &[Flash::error(BookingError::AlreadyCancelled.to_string())],
        ));
    }
    let room_name = load_room(&state, &booking.room_id)?.name;

    let form = BookingForm {
        guest_name: booking.guest_name.clone(),
        email: booking.email.clone(),
        phone_number: booking.phone_number.clone().unwrap_or_default(),
        check_in: booking.check_in_date.to_string(),
        check_out: booking.check_out_date.to_string(),
    };
    let page = EditBookingTemplate {
        page: Page::new(Some(user), &flashes),
        booking,
        room_name,
        form,
        errors: Vec::new(),
        today: Utc::now().date_naive().to_string(),
    };
    Ok(flash::consume(&flashes, Html(page)))
}

async fn edit_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(booking_id): Path<String>,
    Form(form): Form<BookingForm>,
) -> AppResult<Response> {
    let booking = {
        let conn = state.db.get()?;
        booking::find_for_user(&conn, &booking_id, &user.id)?.ok_or(AppError::NotFound)?
    };
    let room_name = load_room(&state, &booking.room_id)?.name;

    let rerender = |booking: Booking, form: BookingForm, errors: Vec<String>, user: CurrentUser| {
        Html(EditBookingTemplate {
            page: Page::new(Some(user), &Flashes::default()),
            booking,
            room_name: room_name.clone(),
            form,
            errors,
            today: Utc::now().date_naive().to_string(),
        })
        .into_response()
    };

    let (guest, stay) = match read_form(&form) {
        Ok(parts) => parts,
        Err(errors) => return Ok(rerender(booking, form, errors, user)),
    };

    let updated = {
        let mut conn = state.db.get()?;
        booking::update_booking(&mut conn, &booking.id, &user.id, BookingChanges { guest, stay })
    };
    match updated {
        Ok(_) => Ok(flash::redirect_with(
            "/bookings",
            &[Flash::success("Your booking has been successfully updated.")],
        )),
        Err(BookingError::NotFound) => Err(AppError::NotFound),
        Err(e @ BookingError::AlreadyCancelled) => Ok(flash::redirect_with(
            "/bookings",
            &[Flash::error(e.to_string())],
        )),
        Err(e) if e.is_user_facing() => Ok(rerender(booking, form, vec![e.to_string()], user)),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}

async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(booking_id): Path<String>,
) -> AppResult<Response> {
    let result = {
        let conn = state.db.get()?;
        booking::cancel_booking(
            &conn,
            &booking_id,
            &user.id,
            state.config.booking.check_in_time(),
            Utc::now().naive_utc(),
        )
    };

    let flash = match result {
        Ok(_) => Flash::success("Booking cancelled successfully."),
        Err(BookingError::NotFound) => return Err(AppError::NotFound),
        Err(e) if e.is_user_facing() => Flash::error(e.to_string()),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };
    Ok(flash::redirect_with("/bookings", &[flash]))
}
