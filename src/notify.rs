use chrono::Utc;
use ulid::Ulid;

use crate::model::{CleaningTask, Notification, Profile, Reservation};

/// Notification kind written by the lifecycle sweep.
pub const RESERVATION_COMPLETED: &str = "reservation_completed";

/// One notification row per admin for a reservation the sweep completed.
/// Rows start unread; the dashboard flips the flag on view.
pub fn completion_notifications(
    admins: &[Profile],
    reservation: &Reservation,
    property_name: &str,
) -> Vec<Notification> {
    let guest = reservation.guest_name.as_deref().unwrap_or("Guest");
    let message = format!(
        "The reservation for {guest} at {property_name} has been marked as completed. Check-out: {}",
        reservation.check_out.format("%d/%m/%Y")
    );
    admins
        .iter()
        .map(|admin| Notification {
            id: Ulid::new(),
            user_id: admin.id,
            title: "Reservation completed automatically".to_string(),
            message: message.clone(),
            kind: RESERVATION_COMPLETED.to_string(),
            related_id: Some(reservation.id),
            read: false,
            created_at: Utc::now(),
        })
        .collect()
}

/// Message body sent to a cleaner when a task is assigned.
pub fn cleaning_message(
    task: &CleaningTask,
    property_name: &str,
    outgoing_guest: Option<&str>,
) -> String {
    format!(
        "New cleaning assignment:\n\n\
         Property: {property_name}\n\
         Date: {}\n\
         Outgoing guest: {}\n\
         Time: {}-{}\n\
         Notes: {}",
        task.cleaning_date.format("%d/%m/%Y"),
        outgoing_guest.unwrap_or("Not specified"),
        task.window.start.format("%H:%M"),
        task.window.end.format("%H:%M"),
        task.notes.as_deref().unwrap_or("No additional notes"),
    )
}

/// Deep link that opens a WhatsApp conversation with the message
/// pre-filled. The phone is reduced to digits; the text is URL-encoded.
pub fn whatsapp_link(phone: &str, message: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(message))
}
