use crate::db::models::Booking;
use crate::mail::{Email, MailError, Mailer};

pub fn confirmation_email(booking: &Booking, room_name: &str) -> Email {
    Email {
        to: booking.email.clone(),
        subject: "Booking Confirmation".to_string(),
        body: format!(
            "Thank you for your booking, {}! Your stay at {} from {} to {} is confirmed.\n\
             Total price: {}\n\
             Booking reference: {}",
            booking.guest_name,
            room_name,
            booking.check_in_date,
            booking.check_out_date,
            booking.total_price_display(),
            booking.id,
        ),
    }
}

/// Send the confirmation for a saved booking. Failures are logged and
/// returned; the booking stays confirmed either way.
pub async fn send_confirmation(
    mailer: &dyn Mailer,
    booking: &Booking,
    room_name: &str,
) -> Result<(), MailError> {
    let email = confirmation_email(booking, room_name);
    mailer.send(&email).await.inspect_err(|e| {
        tracing::warn!(booking_id = %booking.id, "Confirmation email failed: {}", e);
    })
}
