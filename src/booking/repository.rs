use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::booking::rules::{self, StayDates};
use crate::catalog;
use crate::db::models::{to_cents, Booking, BookingStatus};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("This room is currently not available for booking.")]
    RoomClosed,

    #[error("The room is not available for the selected dates")]
    Unavailable,

    #[error("Booking not found")]
    NotFound,

    #[error("This booking has been cancelled")]
    AlreadyCancelled,

    #[error("Bookings can only be cancelled more than 24 hours before check-in.")]
    CancellationWindowClosed,

    #[error("Total price is out of range")]
    PriceOutOfRange,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl BookingError {
    /// Errors the guest can fix by resubmitting the form.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            BookingError::RoomClosed
                | BookingError::Unavailable
                | BookingError::AlreadyCancelled
                | BookingError::CancellationWindowClosed
        )
    }
}

#[derive(Debug, Clone)]
pub struct GuestDetails {
    pub guest_name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: String,
    pub user_id: Option<String>,
    pub guest: GuestDetails,
    pub stay: StayDates,
}

#[derive(Debug, Clone)]
pub struct BookingChanges {
    pub guest: GuestDetails,
    pub stay: StayDates,
}

/// A booking together with the name of its room, for listings.
#[derive(Debug, Clone)]
pub struct BookingSummary {
    pub booking: Booking,
    pub room_name: String,
}

/// True when no active booking of the room overlaps `stay`.
pub fn is_room_available(
    conn: &Connection,
    room_id: &str,
    stay: &StayDates,
    exclude_booking_id: Option<&str>,
) -> rusqlite::Result<bool> {
    let overlapping: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE room_id = ?1
           AND status != 'CANCELLED'
           AND check_in_date < ?3
           AND check_out_date > ?2
           AND (?4 IS NULL OR id != ?4)",
        params![room_id, stay.check_in(), stay.check_out(), exclude_booking_id],
        |row| row.get(0),
    )?;
    Ok(overlapping == 0)
}

/// Insert a confirmed booking. The availability check and the insert share
/// one IMMEDIATE transaction so concurrent requests cannot both pass the check.
pub fn create_booking(conn: &mut Connection, new: NewBooking) -> Result<Booking, BookingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let room = catalog::get_room(&tx, &new.room_id)?.ok_or(BookingError::RoomNotFound)?;
    if !room.available {
        return Err(BookingError::RoomClosed);
    }
    if !is_room_available(&tx, &room.id, &new.stay, None)? {
        return Err(BookingError::Unavailable);
    }

    let total = rules::total_price(room.price, &new.stay);
    let total_cents = to_cents(total).ok_or(BookingError::PriceOutOfRange)?;
    let id = uuid::Uuid::now_v7().to_string();

    tx.execute(
        "INSERT INTO bookings (id, room_id, user_id, guest_name, email, phone_number,
                               check_in_date, check_out_date, total_price_cents, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            room.id,
            new.user_id,
            new.guest.guest_name,
            new.guest.email,
            new.guest.phone_number,
            new.stay.check_in(),
            new.stay.check_out(),
            total_cents,
            BookingStatus::Confirmed,
        ],
    )?;

    let booking = find_by_id(&tx, &id)?.ok_or(BookingError::NotFound)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        room_id = %booking.room_id,
        check_in = %booking.check_in_date,
        check_out = %booking.check_out_date,
        "Booking confirmed"
    );
    Ok(booking)
}

/// Change dates and guest details of a user's booking. The booking itself is
/// excluded from the overlap test; the price is recomputed from the room rate.
pub fn update_booking(
    conn: &mut Connection,
    booking_id: &str,
    user_id: &str,
    changes: BookingChanges,
) -> Result<Booking, BookingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let booking = find_for_user(&tx, booking_id, user_id)?.ok_or(BookingError::NotFound)?;
    if !booking.status.is_active() {
        return Err(BookingError::AlreadyCancelled);
    }
    let room = catalog::get_room(&tx, &booking.room_id)?.ok_or(BookingError::RoomNotFound)?;
    if !is_room_available(&tx, &room.id, &changes.stay, Some(&booking.id))? {
        return Err(BookingError::Unavailable);
    }

    let total = rules::total_price(room.price, &changes.stay);
    let total_cents = to_cents(total).ok_or(BookingError::PriceOutOfRange)?;

    tx.execute(
        "UPDATE bookings
         SET guest_name = ?1, email = ?2, phone_number = ?3,
             check_in_date = ?4, check_out_date = ?5, total_price_cents = ?6,
             updated_at = datetime('now')
         WHERE id = ?7",
        params![
            changes.guest.guest_name,
            changes.guest.email,
            changes.guest.phone_number,
            changes.stay.check_in(),
            changes.stay.check_out(),
            total_cents,
            booking.id,
        ],
    )?;

    let updated = find_by_id(&tx, &booking.id)?.ok_or(BookingError::NotFound)?;
    tx.commit()?;

    tracing::info!(booking_id = %updated.id, "Booking updated");
    Ok(updated)
}

/// Mark a user's booking cancelled. The row is kept.
pub fn cancel_booking(
    conn: &Connection,
    booking_id: &str,
    user_id: &str,
    check_in_time: NaiveTime,
    now: NaiveDateTime,
) -> Result<Booking, BookingError> {
    let booking = find_for_user(conn, booking_id, user_id)?.ok_or(BookingError::NotFound)?;
    if !booking.status.is_active() {
        return Err(BookingError::AlreadyCancelled);
    }
    if !rules::can_cancel(booking.check_in_date, check_in_time, now) {
        return Err(BookingError::CancellationWindowClosed);
    }

    conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![BookingStatus::Cancelled, booking.id],
    )?;

    tracing::info!(booking_id = %booking.id, "Booking cancelled");
    find_by_id(conn, &booking.id)?.ok_or(BookingError::NotFound)
}

pub fn find_by_id(conn: &Connection, booking_id: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {} FROM bookings WHERE id = ?1", Booking::COLUMNS),
        params![booking_id],
        Booking::from_row,
    )
    .optional()
}

/// A booking only when it belongs to `user_id`.
pub fn find_for_user(
    conn: &Connection,
    booking_id: &str,
    user_id: &str,
) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM bookings WHERE id = ?1 AND user_id = ?2",
            Booking::COLUMNS
        ),
        params![booking_id, user_id],
        Booking::from_row,
    )
    .optional()
}

/// A user's bookings, latest check-in first.
pub fn list_for_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<BookingSummary>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.room_id, b.user_id, b.guest_name, b.email, b.phone_number,
                b.check_in_date, b.check_out_date, b.total_price_cents, b.status,
                b.created_at, b.updated_at, r.name
         FROM bookings b
         JOIN rooms r ON r.id = b.room_id
         WHERE b.user_id = ?1
         ORDER BY b.check_in_date DESC",
    )?;

    let bookings = stmt
        .query_map(params![user_id], |row| {
            Ok(BookingSummary {
                booking: Booking::from_row(row)?,
                room_name: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(bookings)
}

/// All bookings of a room in check-in order.
pub fn list_for_room(conn: &Connection, room_id: &str) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM bookings WHERE room_id = ?1 ORDER BY check_in_date ASC",
        Booking::COLUMNS
    ))?;

    let bookings = stmt
        .query_map(params![room_id], Booking::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(bookings)
}
