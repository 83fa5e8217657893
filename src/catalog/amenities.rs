use rusqlite::{params, Connection};

use crate::catalog::CatalogError;
use crate::db::is_constraint_violation;
use crate::db::models::Amenity;

pub fn list_amenities(conn: &Connection) -> rusqlite::Result<Vec<Amenity>> {
    let mut stmt = conn.prepare("SELECT id, name FROM amenities ORDER BY name ASC")?;
    let amenities = stmt
        .query_map([], |row| {
            Ok(Amenity {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(amenities)
}

pub fn amenities_for_room(conn: &Connection, room_id: &str) -> rusqlite::Result<Vec<Amenity>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name
         FROM amenities a
         JOIN room_amenities ra ON ra.amenity_id = a.id
         WHERE ra.room_id = ?1
         ORDER BY a.name ASC",
    )?;
    let amenities = stmt
        .query_map(params![room_id], |row| {
            Ok(Amenity {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(amenities)
}

pub fn create_amenity(conn: &Connection, name: &str) -> Result<Amenity, CatalogError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 50 {
        return Err(CatalogError::invalid("Amenity name must be 1-50 characters"));
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO amenities (id, name) VALUES (?1, ?2)",
        params![id, name],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            CatalogError::Duplicate(format!("Amenity {:?}", name))
        } else {
            CatalogError::Database(e)
        }
    })?;

    Ok(Amenity {
        id,
        name: name.to_string(),
    })
}

pub fn delete_amenity(conn: &Connection, amenity_id: &str) -> Result<(), CatalogError> {
    let deleted = conn.execute("DELETE FROM amenities WHERE id = ?1", params![amenity_id])?;
    if deleted == 0 {
        return Err(CatalogError::NotFound);
    }
    Ok(())
}

/// Replace the room's amenity set.
pub fn set_room_amenities(
    conn: &mut Connection,
    room_id: &str,
    amenity_ids: &[String],
) -> Result<Vec<Amenity>, CatalogError> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM rooms WHERE id = ?1",
        params![room_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(CatalogError::NotFound);
    }

    tx.execute(
        "DELETE FROM room_amenities WHERE room_id = ?1",
        params![room_id],
    )?;
    for amenity_id in amenity_ids {
        tx.execute(
            "INSERT OR IGNORE INTO room_amenities (room_id, amenity_id) VALUES (?1, ?2)",
            params![room_id, amenity_id],
        )
        .map_err(|e| match e {
            // Unknown amenity id
            rusqlite::Error::SqliteFailure(_, _) => {
                CatalogError::invalid(format!("Unknown amenity: {}", amenity_id))
            }
            other => CatalogError::Database(other),
        })?;
    }

    let amenities = amenities_for_room(&tx, room_id)?;
    tx.commit()?;
    Ok(amenities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    fn insert_room(conn: &Connection, id: &str) {
        conn.execute(
            "INSERT INTO rooms (id, name, room_type, price_cents) VALUES (?1, 'Room', 'STD', 100)",
            params![id],
        )
        .unwrap();
    }

    #[test]
    fn amenities_are_listed_by_name() {
        let conn = test_conn();
        create_amenity(&conn, "Wi-Fi").unwrap();
        create_amenity(&conn, "Balcony").unwrap();

        let names: Vec<String> = list_amenities(&conn)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Balcony", "Wi-Fi"]);
    }

    #[test]
    fn duplicate_amenity_is_rejected() {
        let conn = test_conn();
        create_amenity(&conn, "TV").unwrap();
        assert!(matches!(
            create_amenity(&conn, "TV"),
            Err(CatalogError::Duplicate(_))
        ));
    }

    #[test]
    fn blank_amenity_is_rejected() {
        let conn = test_conn();
        assert!(matches!(
            create_amenity(&conn, "   "),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn set_room_amenities_replaces_the_set() {
        let mut conn = test_conn();
        insert_room(&conn, "r1");
        let tv = create_amenity(&conn, "TV").unwrap();
        let bath = create_amenity(&conn, "Bathtub").unwrap();

        set_room_amenities(&mut conn, "r1", &[tv.id.clone()]).unwrap();
        let current = set_room_amenities(&mut conn, "r1", &[bath.id.clone()]).unwrap();
        assert_eq!(current, vec![bath]);
    }

    #[test]
    fn set_room_amenities_rejects_unknown_ids() {
        let mut conn = test_conn();
        insert_room(&conn, "r1");
        let result = set_room_amenities(&mut conn, "r1", &["missing".to_string()]);
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn deleting_an_amenity_detaches_it() {
        let mut conn = test_conn();
        insert_room(&conn, "r1");
        let tv = create_amenity(&conn, "TV").unwrap();
        set_room_amenities(&mut conn, "r1", &[tv.id.clone()]).unwrap();

        delete_amenity(&conn, &tv.id).unwrap();
        assert!(amenities_for_room(&conn, "r1").unwrap().is_empty());
        assert!(matches!(
            delete_amenity(&conn, &tv.id),
            Err(CatalogError::NotFound)
        ));
    }
}
