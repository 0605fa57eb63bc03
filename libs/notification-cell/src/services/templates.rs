use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use scheduling_cell::models::{Booking, MeetingType, SessionType, Therapist};
use scheduling_cell::services::dispatch::RecipientRole;

use crate::models::RenderedEmail;

/// Wall-clock rendering in the booking's display timezone, UTC if it is unknown.
fn local_time(instant: DateTime<Utc>, timezone: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => instant.with_timezone(&tz).format("%A %-d %B %Y, %H:%M %Z").to_string(),
        Err(_) => instant.format("%A %-d %B %Y, %H:%M UTC").to_string(),
    }
}

fn where_line(booking: &Booking) -> String {
    match booking.meeting_type {
        MeetingType::Video => match &booking.meeting_link {
            Some(link) => format!("Join online: {}", link),
            None => "Online session. The joining link will follow separately.".to_string(),
        },
        MeetingType::Phone => "By phone. Your therapist will call you at the start time.".to_string(),
        MeetingType::InPerson => match &booking.meeting_location {
            Some(location) => format!("Location: {}", location),
            None => "In person at the practice.".to_string(),
        },
    }
}

pub fn render_confirmation(
    recipient: RecipientRole,
    booking: &Booking,
    therapist: &Therapist,
    session_type: &SessionType,
    practice_name: &str,
) -> RenderedEmail {
    let when = local_time(booking.start_datetime, &booking.timezone);

    match recipient {
        RecipientRole::Client => RenderedEmail {
            subject: format!("Booking confirmed: {} on {}", session_type.name, when),
            text: format!(
                "Hello {client},\n\n\
                Your {session} with {therapist} is confirmed.\n\n\
                When: {when} ({minutes} minutes)\n\
                {place}\n\
                Reference: {reference}\n\n\
                Quote your reference if you need to change or cancel.\n\n\
                {practice}",
                client = booking.client_name,
                session = session_type.name,
                therapist = therapist.display_name,
                when = when,
                minutes = booking.duration_minutes(),
                place = where_line(booking),
                reference = booking.booking_reference,
                practice = practice_name,
            ),
        },
        RecipientRole::Therapist => {
            let mut text = format!(
                "New booking {reference}\n\n\
                Client: {client} <{email}>\n\
                Session: {session}\n\
                When: {when} ({minutes} minutes)\n\
                {place}\n",
                reference = booking.booking_reference,
                client = booking.client_name,
                email = booking.client_email,
                session = session_type.name,
                when = local_time(booking.start_datetime, &booking.timezone),
                minutes = booking.duration_minutes(),
                place = where_line(booking),
            );
            if let Some(phone) = &booking.client_phone {
                text.push_str(&format!("Phone: {}\n", phone));
            }
            if let Some(notes) = &booking.client_notes {
                text.push_str(&format!("\nClient notes:\n{}\n", notes));
            }

            RenderedEmail {
                subject: format!("New booking: {} with {}", session_type.name, booking.client_name),
                text,
            }
        }
    }
}
