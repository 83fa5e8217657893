pub mod notify;
pub mod repository;
pub mod rules;

pub use repository::{
    cancel_booking, create_booking, find_by_id, find_for_user, is_room_available, list_for_room,
    list_for_user, update_booking, BookingChanges, BookingError, BookingSummary, GuestDetails,
    NewBooking,
};
pub use rules::{can_cancel, total_price, DateError, StayDates};
