use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// --- Money ---

/// Decimal amount from integer cents.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Integer cents from a decimal amount, rounded half away from zero.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (round_money(amount) * Decimal::ONE_HUNDRED).to_i64()
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

// --- Enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "STD")]
    Standard,
    #[serde(rename = "DLX")]
    Deluxe,
    #[serde(rename = "SUI")]
    Suite,
}

impl RoomType {
    pub const ALL: [RoomType; 3] = [RoomType::Standard, RoomType::Deluxe, RoomType::Suite];

    pub fn code(&self) -> &'static str {
        match self {
            RoomType::Standard => "STD",
            RoomType::Deluxe => "DLX",
            RoomType::Suite => "SUI",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoomType::Standard => "Standard",
            RoomType::Deluxe => "Deluxe",
            RoomType::Suite => "Suite",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STD" => Ok(RoomType::Standard),
            "DLX" => Ok(RoomType::Deluxe),
            "SUI" => Ok(RoomType::Suite),
            other => Err(format!("unknown room type: {}", other)),
        }
    }
}

impl ToSql for RoomType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for RoomType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Active bookings hold their dates.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

impl ToSql for BookingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BookingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

// --- Rows ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str =
        "id, email, username, password_hash, is_staff, is_superuser, is_active, created_at";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            is_staff: row.get(4)?,
            is_superuser: row.get(5)?,
            is_active: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub price: Decimal,
    pub available: bool,
    pub max_occupancy: i64,
    pub size: i64,
}

impl Room {
    pub const COLUMNS: &'static str =
        "id, name, description, room_type, price_cents, available, max_occupancy, size";

    /// Maps a row selected with [`Room::COLUMNS`] in order.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Room {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            room_type: row.get(3)?,
            price: from_cents(row.get(4)?),
            available: row.get(5)?,
            max_occupancy: row.get(6)?,
            size: row.get(7)?,
        })
    }

    pub fn price_display(&self) -> String {
        format_money(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomImage {
    pub id: String,
    pub room_id: String,
    pub file_path: String,
    pub caption: String,
    pub position: i64,
    pub is_primary: bool,
}

impl RoomImage {
    pub const COLUMNS: &'static str = "id, room_id, file_path, caption, position, is_primary";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RoomImage {
            id: row.get(0)?,
            room_id: row.get(1)?,
            file_path: row.get(2)?,
            caption: row.get(3)?,
            position: row.get(4)?,
            is_primary: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub room_id: String,
    pub user_id: Option<String>,
    pub guest_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    pub const COLUMNS: &'static str = "id, room_id, user_id, guest_name, email, phone_number, \
         check_in_date, check_out_date, total_price_cents, status, created_at, updated_at";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Booking {
            id: row.get(0)?,
            room_id: row.get(1)?,
            user_id: row.get(2)?,
            guest_name: row.get(3)?,
            email: row.get(4)?,
            phone_number: row.get(5)?,
            check_in_date: row.get(6)?,
            check_out_date: row.get(7)?,
            total_price: from_cents(row.get(8)?),
            status: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    pub fn nights(&self) -> i64 {
        (self.check_out_date - self.check_in_date).num_days()
    }

    pub fn total_price_display(&self) -> String {
        format_money(self.total_price)
    }
}
