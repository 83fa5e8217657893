//! One-shot CLI tasks run instead of the web server.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rust_decimal::Decimal;

use crate::accounts;
use crate::catalog::{self, CatalogError, RoomInput};
use crate::db::models::RoomType;
use crate::state::DbPool;
use crate::storage::{self, StorageBackend, ROOM_IMAGE_DIR};

pub fn create_superuser(pool: &DbPool, email: &str, username: &str, password: &str) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let user = accounts::create_superuser(&mut conn, email, username, password)
        .with_context(|| format!("could not create superuser {}", email))?;
    tracing::info!(user_id = %user.id, "Superuser {} created", user.email);
    Ok(())
}

const DEMO_AMENITIES: &[&str] = &[
    "WiFi",
    "Air conditioning",
    "Minibar",
    "Sea view",
    "Balcony",
    "Room service",
];

struct DemoRoom {
    name: &'static str,
    description: &'static str,
    room_type: RoomType,
    price_cents: i64,
    max_occupancy: i64,
    size: i64,
    amenities: &'static [&'static str],
}

const DEMO_ROOMS: &[DemoRoom] = &[
    DemoRoom {
        name: "Garden Single",
        description: "A quiet single room overlooking the garden.",
        room_type: RoomType::Standard,
        price_cents: 8900,
        max_occupancy: 1,
        size: 180,
        amenities: &["WiFi"],
    },
    DemoRoom {
        name: "Courtyard Double",
        description: "Double bed, writing desk and a window on the courtyard.",
        room_type: RoomType::Standard,
        price_cents: 12000,
        max_occupancy: 2,
        size: 240,
        amenities: &["WiFi", "Air conditioning"],
    },
    DemoRoom {
        name: "Harbour Deluxe",
        description: "King bed with a private balcony above the harbour.",
        room_type: RoomType::Deluxe,
        price_cents: 19500,
        max_occupancy: 2,
        size: 320,
        amenities: &["WiFi", "Air conditioning", "Minibar", "Balcony"],
    },
    DemoRoom {
        name: "Sea View Suite",
        description: "Separate living room, two bedrooms and a wide view of the sea.",
        room_type: RoomType::Suite,
        price_cents: 34000,
        max_occupancy: 4,
        size: 560,
        amenities: &["WiFi", "Air conditioning", "Minibar", "Sea view", "Balcony", "Room service"],
    },
];

/// Counts of what a seed run inserted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub amenities: usize,
    pub rooms: usize,
}

/// Insert demo amenities and rooms. Amenities that already exist are kept;
/// rooms are only added to an empty catalogue.
pub fn seed(pool: &DbPool) -> anyhow::Result<SeedReport> {
    let mut conn = pool.get()?;
    let mut report = SeedReport::default();

    for name in DEMO_AMENITIES {
        match catalog::create_amenity(&conn, name) {
            Ok(_) => report.amenities += 1,
            Err(CatalogError::Duplicate(_)) => {}
            Err(e) => return Err(e).context("could not seed amenities"),
        }
    }

    let room_count: i64 = conn.query_row("SELECT COUNT(*) FROM rooms", [], |row| row.get(0))?;
    if room_count > 0 {
        tracing::info!("Catalogue already has {} rooms, skipping demo rooms", room_count);
        return Ok(report);
    }

    let amenities = catalog::list_amenities(&conn)?;
    for demo in DEMO_ROOMS {
        let input = RoomInput {
            name: demo.name.to_string(),
            description: demo.description.to_string(),
            room_type: demo.room_type,
            price: Decimal::new(demo.price_cents, 2),
            available: true,
            max_occupancy: demo.max_occupancy,
            size: demo.size,
        };
        let room = catalog::create_room(&conn, &input)?;
        let ids: Vec<String> = amenities
            .iter()
            .filter(|a| demo.amenities.contains(&a.name.as_str()))
            .map(|a| a.id.clone())
            .collect();
        catalog::set_room_amenities(&mut conn, &room.id, &ids)?;
        report.rooms += 1;
    }

    tracing::info!(
        amenities = report.amenities,
        rooms = report.rooms,
        "Demo data seeded"
    );
    Ok(report)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| storage::is_room_image(&mime))
}

/// Copy every image under `dir` into storage as `room_images/<relative path>`.
/// Returns the stored names.
pub async fn upload_media(storage: &dyn StorageBackend, dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files).with_context(|| format!("could not read {}", dir.display()))?;
    files.sort();

    let mut stored = Vec::new();
    for path in files {
        if !is_image(&path) {
            tracing::debug!("Skipping non-image {}", path.display());
            continue;
        }
        let relative = path.strip_prefix(dir)?;
        let parts: Vec<&str> = relative
            .iter()
            .map(|part| part.to_str().context("file names must be UTF-8"))
            .collect::<anyhow::Result<_>>()?;
        let name = format!("{}/{}", ROOM_IMAGE_DIR, parts.join("/"));
        storage::validate_name(&name)?;

        let content = tokio::fs::read(&path).await?;
        let saved = storage.save(&name, &content).await?;
        tracing::info!("Uploaded {} as {}", path.display(), saved);
        stored.push(saved);
    }

    tracing::info!("Uploaded {} files to {} storage", stored.len(), storage.kind());
    Ok(stored)
}
