use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::booking::StayDates;
use crate::catalog::{amenities_for_room, images_for_room, CatalogError};
use crate::db::models::{to_cents, Amenity, Room, RoomImage, RoomType};

/// Room fields as submitted by staff.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoomInput {
    #[validate(custom(function = "room_name"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub room_type: RoomType,
    #[validate(custom(function = "non_negative_price"))]
    pub price: Decimal,
    #[serde(default = "default_available")]
    pub available: bool,
    #[validate(range(min = 1, message = "Max occupancy must be at least 1"))]
    pub max_occupancy: i64,
    #[validate(range(min = 0, message = "Size cannot be negative"))]
    #[serde(default)]
    pub size: i64,
}

fn default_available() -> bool {
    true
}

/// Names are stored trimmed, so the length is checked after trimming.
fn room_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if !(1..=100).contains(&len) {
        let mut err = ValidationError::new("length");
        err.message = Some("Name must be 1-100 characters".into());
        return Err(err);
    }
    Ok(())
}

fn non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Search criteria for the room listing. Empty criteria list every open room.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub stay: Option<StayDates>,
    pub room_type: Option<RoomType>,
    pub max_price: Option<Decimal>,
    pub amenity_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RoomDetail {
    pub room: Room,
    pub amenities: Vec<Amenity>,
    pub images: Vec<RoomImage>,
}

pub fn get_room(conn: &Connection, room_id: &str) -> rusqlite::Result<Option<Room>> {
    conn.query_row(
        &format!("SELECT {} FROM rooms WHERE id = ?1", Room::COLUMNS),
        params![room_id],
        Room::from_row,
    )
    .optional()
}

pub fn room_detail(conn: &Connection, room_id: &str) -> rusqlite::Result<Option<RoomDetail>> {
    let Some(room) = get_room(conn, room_id)? else {
        return Ok(None);
    };
    let amenities = amenities_for_room(conn, &room.id)?;
    let images = images_for_room(conn, &room.id)?;
    Ok(Some(RoomDetail {
        room,
        amenities,
        images,
    }))
}

/// Open rooms matching `filter`, cheapest first.
pub fn list_rooms(conn: &Connection, filter: &RoomFilter) -> rusqlite::Result<Vec<Room>> {
    let mut sql = format!(
        "SELECT {} FROM rooms r WHERE r.available = 1",
        Room::COLUMNS
            .split(", ")
            .map(|c| format!("r.{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(stay) = &filter.stay {
        args.push(Box::new(stay.check_in()));
        let check_in = args.len();
        args.push(Box::new(stay.check_out()));
        let check_out = args.len();
        sql.push_str(&format!(
            " AND NOT EXISTS (
                SELECT 1 FROM bookings b
                WHERE b.room_id = r.id
                  AND b.status != 'CANCELLED'
                  AND b.check_in_date < ?{check_out}
                  AND b.check_out_date > ?{check_in})"
        ));
    }

    if let Some(room_type) = filter.room_type {
        args.push(Box::new(room_type));
        sql.push_str(&format!(" AND r.room_type = ?{}", args.len()));
    }

    if let Some(max_price) = filter.max_price {
        // A ceiling too large for cents filters nothing out.
        if let Some(cents) = to_cents(max_price) {
            args.push(Box::new(cents));
            sql.push_str(&format!(" AND r.price_cents <= ?{}", args.len()));
        }
    }

    if !filter.amenity_ids.is_empty() {
        let mut placeholders = Vec::with_capacity(filter.amenity_ids.len());
        for id in &filter.amenity_ids {
            args.push(Box::new(id.clone()));
            placeholders.push(format!("?{}", args.len()));
        }
        sql.push_str(&format!(
            " AND EXISTS (
                SELECT 1 FROM room_amenities ra
                WHERE ra.room_id = r.id AND ra.amenity_id IN ({}))",
            placeholders.join(", ")
        ));
    }

    sql.push_str(" ORDER BY r.price_cents ASC, r.name ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rooms = stmt
        .query_map(params_from_iter(args.iter()), Room::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rooms)
}

pub fn create_room(conn: &Connection, input: &RoomInput) -> Result<Room, CatalogError> {
    input.validate()?;
    let price_cents = to_cents(input.price).ok_or_else(|| CatalogError::invalid("Price is too large"))?;
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO rooms (id, name, description, room_type, price_cents, available, max_occupancy, size)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            input.name.trim(),
            input.description,
            input.room_type,
            price_cents,
            input.available,
            input.max_occupancy,
            input.size,
        ],
    )?;

    get_room(conn, &id)?.ok_or(CatalogError::NotFound)
}

pub fn update_room(conn: &Connection, room_id: &str, input: &RoomInput) -> Result<Room, CatalogError> {
    input.validate()?;
    let price_cents = to_cents(input.price).ok_or_else(|| CatalogError::invalid("Price is too large"))?;

    let changed = conn.execute(
        "UPDATE rooms
         SET name = ?1, description = ?2, room_type = ?3, price_cents = ?4,
             available = ?5, max_occupancy = ?6, size = ?7
         WHERE id = ?8",
        params![
            input.name.trim(),
            input.description,
            input.room_type,
            price_cents,
            input.available,
            input.max_occupancy,
            input.size,
            room_id,
        ],
    )?;
    if changed == 0 {
        return Err(CatalogError::NotFound);
    }

    get_room(conn, room_id)?.ok_or(CatalogError::NotFound)
}

/// Delete a room with its images and bookings. Returns the stored image
/// paths so the caller can remove the files.
pub fn delete_room(conn: &Connection, room_id: &str) -> Result<Vec<String>, CatalogError> {
    let paths = images_for_room(conn, room_id)?
        .into_iter()
        .map(|image| image.file_path)
        .collect();

    let deleted = conn.execute("DELETE FROM rooms WHERE id = ?1", params![room_id])?;
    if deleted == 0 {
        return Err(CatalogError::NotFound);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{create_amenity, set_room_amenities};
    use crate::db::test_conn;
    use chrono::NaiveDate;

    fn input(name: &str, room_type: RoomType, price: i64) -> RoomInput {
        RoomInput {
            name: name.to_string(),
            description: String::new(),
            room_type,
            price: Decimal::new(price, 0),
            available: true,
            max_occupancy: 2,
            size: 200,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn names(rooms: &[Room]) -> Vec<&str> {
        rooms.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn create_room_validates_input() {
        let conn = test_conn();

        let mut bad = input("", RoomType::Standard, 100);
        assert!(matches!(create_room(&conn, &bad), Err(CatalogError::Invalid(_))));

        bad = input("Attic", RoomType::Standard, -5);
        assert!(matches!(create_room(&conn, &bad), Err(CatalogError::Invalid(_))));

        bad = input("Attic", RoomType::Standard, 100);
        bad.max_occupancy = 0;
        assert!(matches!(create_room(&conn, &bad), Err(CatalogError::Invalid(_))));

        bad = input("Attic", RoomType::Standard, 100);
        bad.size = -1;
        assert!(matches!(create_room(&conn, &bad), Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn blank_room_names_are_rejected_after_trimming() {
        let conn = test_conn();
        let blank = input("   ", RoomType::Standard, 100);
        assert!(matches!(create_room(&conn, &blank), Err(CatalogError::Invalid(_))));

        let room = create_room(&conn, &input("  Attic  ", RoomType::Standard, 100)).unwrap();
        assert_eq!(room.name, "Attic");
        assert!(matches!(
            update_room(&conn, &room.id, &blank),
            Err(CatalogError::Invalid(_))
        ));

        let long = format!("  {}  ", "a".repeat(100));
        assert!(create_room(&conn, &input(&long, RoomType::Standard, 100)).is_ok());
    }

    #[test]
    fn free_rooms_are_allowed() {
        let conn = test_conn();
        let room = create_room(&conn, &input("Staff Room", RoomType::Standard, 0)).unwrap();
        assert_eq!(room.price_display(), "0.00");
    }

    #[test]
    fn list_rooms_hides_closed_rooms_and_orders_by_price() {
        let conn = test_conn();
        create_room(&conn, &input("Suite", RoomType::Suite, 300)).unwrap();
        create_room(&conn, &input("Single", RoomType::Standard, 80)).unwrap();
        let mut closed = input("Closed", RoomType::Standard, 50);
        closed.available = false;
        create_room(&conn, &closed).unwrap();

        let rooms = list_rooms(&conn, &RoomFilter::default()).unwrap();
        assert_eq!(names(&rooms), vec!["Single", "Suite"]);
    }

    #[test]
    fn list_rooms_filters_by_type_and_price() {
        let conn = test_conn();
        create_room(&conn, &input("Suite", RoomType::Suite, 300)).unwrap();
        create_room(&conn, &input("Deluxe", RoomType::Deluxe, 150)).unwrap();
        create_room(&conn, &input("Single", RoomType::Standard, 80)).unwrap();

        let by_type = RoomFilter {
            room_type: Some(RoomType::Deluxe),
            ..RoomFilter::default()
        };
        assert_eq!(names(&list_rooms(&conn, &by_type).unwrap()), vec!["Deluxe"]);

        let by_price = RoomFilter {
            max_price: Some(Decimal::new(150, 0)),
            ..RoomFilter::default()
        };
        assert_eq!(
            names(&list_rooms(&conn, &by_price).unwrap()),
            vec!["Single", "Deluxe"]
        );
    }

    #[test]
    fn list_rooms_excludes_booked_rooms() {
        let conn = test_conn();
        let booked = create_room(&conn, &input("Booked", RoomType::Standard, 100)).unwrap();
        create_room(&conn, &input("Free", RoomType::Standard, 120)).unwrap();
        conn.execute(
            "INSERT INTO bookings (id, room_id, guest_name, email, check_in_date, check_out_date, total_price_cents, status)
             VALUES ('b1', ?1, 'Ann', 'ann@example.com', '2025-01-10', '2025-01-12', 20000, 'CONFIRMED')",
            params![booked.id],
        )
        .unwrap();

        let overlapping = RoomFilter {
            stay: Some(StayDates::unchecked(date(11), date(13)).unwrap()),
            ..RoomFilter::default()
        };
        assert_eq!(names(&list_rooms(&conn, &overlapping).unwrap()), vec!["Free"]);

        let back_to_back = RoomFilter {
            stay: Some(StayDates::unchecked(date(12), date(14)).unwrap()),
            ..RoomFilter::default()
        };
        assert_eq!(
            names(&list_rooms(&conn, &back_to_back).unwrap()),
            vec!["Booked", "Free"]
        );
    }

    #[test]
    fn list_rooms_filters_by_any_amenity() {
        let mut conn = test_conn();
        let wifi = create_amenity(&conn, "Wi-Fi").unwrap();
        let tv = create_amenity(&conn, "TV").unwrap();
        let spa = create_amenity(&conn, "Spa").unwrap();
        let a = create_room(&conn, &input("A", RoomType::Standard, 100)).unwrap();
        let b = create_room(&conn, &input("B", RoomType::Standard, 110)).unwrap();
        create_room(&conn, &input("C", RoomType::Standard, 120)).unwrap();
        set_room_amenities(&mut conn, &a.id, &[wifi.id.clone(), tv.id.clone()]).unwrap();
        set_room_amenities(&mut conn, &b.id, &[tv.id.clone()]).unwrap();

        let filter = RoomFilter {
            amenity_ids: vec![wifi.id.clone(), spa.id.clone()],
            ..RoomFilter::default()
        };
        assert_eq!(names(&list_rooms(&conn, &filter).unwrap()), vec!["A"]);

        let filter = RoomFilter {
            amenity_ids: vec![tv.id.clone()],
            ..RoomFilter::default()
        };
        assert_eq!(names(&list_rooms(&conn, &filter).unwrap()), vec!["A", "B"]);
    }

    #[test]
    fn update_and_delete_room() {
        let conn = test_conn();
        let room = create_room(&conn, &input("Old", RoomType::Standard, 100)).unwrap();

        let updated = update_room(&conn, &room.id, &input("New", RoomType::Suite, 250)).unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.room_type, RoomType::Suite);
        assert_eq!(updated.price, Decimal::new(25000, 2));

        delete_room(&conn, &room.id).unwrap();
        assert!(get_room(&conn, &room.id).unwrap().is_none());
        assert!(matches!(delete_room(&conn, &room.id), Err(CatalogError::NotFound)));
        assert!(matches!(
            update_room(&conn, &room.id, &input("X", RoomType::Standard, 1)),
            Err(CatalogError::NotFound)
        ));
    }

    #[test]
    fn room_input_parses_from_json() {
        let input: RoomInput = serde_json::from_str(
            r#"{"name": "Loft", "room_type": "DLX", "price": "149.50", "max_occupancy": 3}"#,
        )
        .unwrap();
        assert_eq!(input.room_type, RoomType::Deluxe);
        assert_eq!(input.price, Decimal::new(14950, 2));
        assert!(input.available);
        assert_eq!(input.size, 0);
    }
}
