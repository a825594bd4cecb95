use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Coordinates;

/// Shown whenever a session proceeds without a precise fix.
pub const DEGRADED_WARNING: &str = "Precise GPS signal lost or denied. Tracking is relying on \
cellular triangulation which may be less accurate. Please keep your phone on.";

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("geolocation not supported on this host")]
    Unsupported,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// One-shot position lookup supplied by the host environment.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position known up front, e.g. passed on the command line.
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Host without any positioning support.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum LocationFix {
    Located { coordinates: Coordinates },
    Degraded { reason: String },
}

impl LocationFix {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            LocationFix::Located { coordinates } => Some(*coordinates),
            LocationFix::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, LocationFix::Degraded { .. })
    }
}

/// Asks the provider for a fix, waiting at most `timeout`. Never fails: any
/// problem is reported as a degraded fix.
pub async fn locate(provider: &dyn LocationProvider, timeout: Duration) -> LocationFix {
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(coordinates)) => LocationFix::Located { coordinates },
        Ok(Err(err)) => {
            warn!("Location lookup failed, proceeding without precise location: {err}");
            LocationFix::Degraded {
                reason: err.to_string(),
            }
        }
        Err(_) => {
            warn!("Location lookup timed out after {timeout:?}, proceeding without precise location");
            LocationFix::Degraded {
                reason: format!("no fix within {}s", timeout.as_secs()),
            }
        }
    }
}
