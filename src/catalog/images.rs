use rusqlite::{params, Connection, OptionalExtension};

use crate::catalog::CatalogError;
use crate::db::models::RoomImage;

pub fn images_for_room(conn: &Connection, room_id: &str) -> rusqlite::Result<Vec<RoomImage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM room_images WHERE room_id = ?1 ORDER BY position ASC, created_at ASC",
        RoomImage::COLUMNS
    ))?;
    let images = stmt
        .query_map(params![room_id], RoomImage::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

pub fn get_image(conn: &Connection, image_id: &str) -> rusqlite::Result<Option<RoomImage>> {
    conn.query_row(
        &format!("SELECT {} FROM room_images WHERE id = ?1", RoomImage::COLUMNS),
        params![image_id],
        RoomImage::from_row,
    )
    .optional()
}

/// The image shown on listings, if the room has any.
pub fn primary_image(conn: &Connection, room_id: &str) -> rusqlite::Result<Option<RoomImage>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM room_images WHERE room_id = ?1 AND is_primary = 1",
            RoomImage::COLUMNS
        ),
        params![room_id],
        RoomImage::from_row,
    )
    .optional()
}

/// Attach an already stored file to a room. The first image of a room
/// becomes its primary image.
pub fn add_image(
    conn: &mut Connection,
    room_id: &str,
    file_path: &str,
    caption: &str,
) -> Result<RoomImage, CatalogError> {
    if caption.chars().count() > 200 {
        return Err(CatalogError::invalid("Caption must be at most 200 characters"));
    }

    let tx = conn.transaction()?;

    let room_exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM rooms WHERE id = ?1",
        params![room_id],
        |row| row.get(0),
    )?;
    if !room_exists {
        return Err(CatalogError::NotFound);
    }

    let (count, next_position): (i64, i64) = tx.query_row(
        "SELECT COUNT(*), COALESCE(MAX(position), -1) + 1 FROM room_images WHERE room_id = ?1",
        params![room_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let id = uuid::Uuid::now_v7().to_string();
    tx.execute(
        "INSERT INTO room_images (id, room_id, file_path, caption, position, is_primary)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, room_id, file_path, caption, next_position, count == 0],
    )?;
    tx.commit()?;

    get_image(conn, &id)?.ok_or(CatalogError::NotFound)
}

/// Make `image_id` the room's only primary image.
pub fn set_primary_image(conn: &mut Connection, image_id: &str) -> Result<RoomImage, CatalogError> {
    let tx = conn.transaction()?;

    let room_id: String = tx
        .query_row(
            "SELECT room_id FROM room_images WHERE id = ?1",
            params![image_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(CatalogError::NotFound)?;

    tx.execute(
        "UPDATE room_images SET is_primary = 0 WHERE room_id = ?1 AND id != ?2",
        params![room_id, image_id],
    )?;
    tx.execute(
        "UPDATE room_images SET is_primary = 1 WHERE id = ?1",
        params![image_id],
    )?;
    tx.commit()?;

    get_image(conn, image_id)?.ok_or(CatalogError::NotFound)
}

/// Remove an image row. When the primary image goes, the next image by
/// position takes over. Returns the removed row so the caller can delete
/// the stored file.
pub fn delete_image(conn: &mut Connection, image_id: &str) -> Result<RoomImage, CatalogError> {
    let tx = conn.transaction()?;

    let image = tx
        .query_row(
            &format!("SELECT {} FROM room_images WHERE id = ?1", RoomImage::COLUMNS),
            params![image_id],
            RoomImage::from_row,
        )
        .optional()?
        .ok_or(CatalogError::NotFound)?;

    tx.execute("DELETE FROM room_images WHERE id = ?1", params![image_id])?;

    if image.is_primary {
        tx.execute(
            "UPDATE room_images SET is_primary = 1
             WHERE id = (
                SELECT id FROM room_images WHERE room_id = ?1
                ORDER BY position ASC, created_at ASC LIMIT 1)",
            params![image.room_id],
        )?;
    }
    tx.commit()?;

    Ok(image)
}
