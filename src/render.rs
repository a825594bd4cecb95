use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::{
    dispatch::{ContactNotice, ContactStatus, Projection, SessionSnapshot, SessionState},
    models::{DispatchRecord, UserProfile},
};

const BAR_WIDTH: usize = 30;
const UNIT_CALLSIGN: &str = "AMB-01";
const REQUEST_RECEIVED: &str = "Request received. Initializing AI Triage...";

pub fn progress_bar(progress_percent: f64) -> String {
    let filled = ((progress_percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        progress_percent
    )
}

/// Status, bar, radar and live log. The log always opens with the request line,
/// stamped with the request time when it is known.
pub fn render_projection(projection: &Projection, started_at: Option<DateTime<Utc>>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Status: {:<13} ETA {}{}",
        projection.status.as_str(),
        projection.countdown,
        if projection.countdown_active { "" } else { " (stopped)" }
    );
    let _ = writeln!(out, "{}", progress_bar(projection.progress_percent));
    let _ = writeln!(
        out,
        "Unit {} at ({:.0}, {:.0}) on radar",
        UNIT_CALLSIGN, projection.unit_position.x, projection.unit_position.y
    );

    let _ = writeln!(out, "Live log:");
    let _ = match started_at {
        Some(at) => {
            let at = at.with_timezone(&Local).format("%H:%M:%S");
            writeln!(out, "  > [{at}] {REQUEST_RECEIVED}")
        }
        None => writeln!(out, "  > {REQUEST_RECEIVED}"),
    };
    for update in &projection.live_updates {
        let _ = writeln!(out, "  > {update}");
    }
    out
}

fn render_record(out: &mut String, record: &DispatchRecord) {
    let _ = writeln!(
        out,
        "Priority: {}   Vehicle: {}   Session: {}",
        record.priority, record.vehicle_type, record.session_id
    );
    if record.is_fallback() {
        let _ = writeln!(out, "(Triage service unavailable; standard dispatch applied.)");
    }
    let _ = writeln!(out, "Summary: {}", record.summary);
    let _ = writeln!(out, "Advice: \"{}\"", record.recommended_action);
    let _ = writeln!(
        out,
        "  Analysis by {} based on reported symptoms.",
        record.assistant_name
    );
}

fn render_contact(out: &mut String, contact: &ContactNotice) {
    let label = match contact.status {
        ContactStatus::NotConfigured => return,
        ContactStatus::NoPhone => "NOT SENT (no phone on file)",
        ContactStatus::Sending => "SENDING...",
        ContactStatus::Sent => "SENT",
    };
    let phone = if contact.contact_phone.is_empty() {
        "no phone"
    } else {
        contact.contact_phone.as_str()
    };
    let name = if contact.contact_name.is_empty() {
        "Emergency contact"
    } else {
        contact.contact_name.as_str()
    };
    let _ = writeln!(
        out,
        "Notifying {} ({}): {}\n  \"{}\"",
        name, phone, label, contact.message
    );
}

/// Full dashboard for one snapshot, as plain text.
pub fn render_dashboard(snapshot: &SessionSnapshot, profile: &UserProfile) -> String {
    let mut out = String::new();
    match snapshot.state {
        SessionState::Idle => {
            let _ = writeln!(out, "Emergency Response: idle. Describe the emergency to request help.");
            if profile.caller_name().is_none() {
                let _ = writeln!(out, "Tip: add your details with `resq profile set` for faster dispatch.");
            }
            return out;
        }
        SessionState::Analyzing => {
            let _ = match profile.first_name() {
                Some(name) => writeln!(out, "Analyzing situation for {name}..."),
                None => writeln!(out, "Analyzing situation..."),
            };
            return out;
        }
        SessionState::Dispatched => {}
    }

    let _ = writeln!(out, "=== ResQ.AI dispatch ===");
    if let Some(warning) = &snapshot.location_warning {
        let _ = writeln!(out, "LOCATION ACCURACY WARNING: {warning}");
    }
    if let Some(record) = &snapshot.record {
        render_record(&mut out, record);
    }
    if let Some(contact) = &snapshot.contact {
        render_contact(&mut out, contact);
    }
    if let Some(projection) = &snapshot.projection {
        out.push_str(&render_projection(projection, snapshot.started_at));
        if projection.status.is_arrived() {
            let _ = writeln!(out, "*** HELP IS HERE ***");
            let _ = writeln!(out, "Responders have arrived at your location.");
            let _ = writeln!(
                out,
                "If you cannot locate the emergency unit, call 911 immediately."
            );
        }
    }
    out
}
