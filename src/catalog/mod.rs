//! Rooms, amenities and room images.

mod amenities;
mod images;
mod rooms;

use validator::ValidationErrors;

pub use self::amenities::{
    amenities_for_room, create_amenity, delete_amenity, list_amenities, set_room_amenities,
};
pub use self::images::{
    add_image, delete_image, get_image, images_for_room, primary_image, set_primary_image,
};
pub use self::rooms::{
    create_room, delete_room, get_room, list_rooms, room_detail, update_room, RoomDetail,
    RoomFilter, RoomInput,
};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CatalogError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CatalogError::Invalid(msg.into())
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        CatalogError::Invalid(crate::forms::error_messages(&errors).join("; "))
    }
}
