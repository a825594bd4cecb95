//! Pure derivation of dashboard status from a dispatch record and the simulated clock.
//!
//! Nothing in here holds state: [`project`] recomputes everything from its two
//! inputs, so any scheduler (real interval, virtual test clock, server timer)
//! can drive it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::DispatchError, models::DispatchRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusLabel {
    #[serde(rename = "DISPATCHED")]
    Dispatched,
    #[serde(rename = "EN ROUTE")]
    EnRoute,
    #[serde(rename = "NEARBY")]
    Nearby,
    #[serde(rename = "ARRIVING NOW")]
    ArrivingNow,
    #[serde(rename = "ON SCENE")]
    OnScene,
    /// Terminal state once the clock itself has run out; stops the countdown.
    #[serde(rename = "ARRIVED")]
    Arrived,
}

impl StatusLabel {
    /// Threshold ladder, first match wins.
    pub fn from_progress(progress_percent: f64) -> Self {
        if progress_percent < 10.0 {
            StatusLabel::Dispatched
        } else if progress_percent < 40.0 {
            StatusLabel::EnRoute
        } else if progress_percent < 80.0 {
            StatusLabel::Nearby
        } else if progress_percent < 100.0 {
            StatusLabel::ArrivingNow
        } else {
            StatusLabel::OnScene
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Dispatched => "DISPATCHED",
            StatusLabel::EnRoute => "EN ROUTE",
            StatusLabel::Nearby => "NEARBY",
            StatusLabel::ArrivingNow => "ARRIVING NOW",
            StatusLabel::OnScene => "ON SCENE",
            StatusLabel::Arrived => "ARRIVED",
        }
    }

    pub fn is_arrived(&self) -> bool {
        matches!(self, StatusLabel::Arrived | StatusLabel::OnScene)
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VEHICLE_PLACEHOLDER: &str = "{vehicle}";

/// (progress threshold, message template) in display order.
const LIVE_UPDATES: [(f64, &str); 5] = [
    (5.0, "Dispatch verified location."),
    (15.0, "{vehicle} has departed station."),
    (40.0, "Traffic analysis: Route clear via Main St."),
    (70.0, "Paramedic team reviewing patient data."),
    (90.0, "Vehicle turning onto your street."),
];

/// Radar grid is 300x300; the unit drives from the top-right toward the caller at the centre.
const UNIT_START: (f64, f64) = (250.0, 50.0);
const UNIT_END: (f64, f64) = (150.0, 150.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UnitPosition {
    pub x: f64,
    pub y: f64,
}

impl UnitPosition {
    fn at(progress_percent: f64) -> Self {
        let t = progress_percent / 100.0;
        Self {
            x: UNIT_START.0 - (UNIT_START.0 - UNIT_END.0) * t,
            y: UNIT_START.1 - (UNIT_START.1 - UNIT_END.1) * t,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub status: StatusLabel,
    pub progress_percent: f64,
    pub remaining_secs: u64,
    /// `m:ss` rendering of `remaining_secs`.
    pub countdown: String,
    pub countdown_active: bool,
    pub live_updates: Vec<String>,
    pub unit_position: UnitPosition,
}

pub fn project(record: &DispatchRecord, elapsed_secs: u64) -> Result<Projection, DispatchError> {
    let eta_secs = record.eta_secs;
    if eta_secs == 0 {
        return Err(DispatchError::InvalidRecord(format!(
            "session {} has a zero ETA",
            record.session_id
        )));
    }

    let remaining_secs = eta_secs.saturating_sub(elapsed_secs);
    let progress_percent =
        ((eta_secs - remaining_secs) as f64 / eta_secs as f64 * 100.0).clamp(0.0, 100.0);

    let status = if remaining_secs == 0 {
        StatusLabel::Arrived
    } else {
        StatusLabel::from_progress(progress_percent)
    };

    Ok(Projection {
        status,
        progress_percent,
        remaining_secs,
        countdown: format_countdown(remaining_secs),
        countdown_active: remaining_secs > 0,
        live_updates: live_updates(&record.vehicle_type, progress_percent),
        unit_position: UnitPosition::at(progress_percent),
    })
}

fn live_updates(vehicle_type: &str, progress_percent: f64) -> Vec<String> {
    LIVE_UPDATES
        .iter()
        .filter(|(threshold, _)| *threshold <= progress_percent)
        .map(|(_, template)| template.replace(VEHICLE_PLACEHOLDER, vehicle_type))
        .collect()
}

pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
