//! `GET /status` response shape (§6), extended with the fill statistics and
//! pressure-feedback line supplemented from `original_source/` (SPEC_FULL
//! §11).

use crate::control::zone::Zone;
use crate::schemas::fill_record::FillStats;
use crate::state_machines::fill_fsm::FillMode;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: String,
    pub zone: String,
    pub current_weight: Pounds,
    pub target_weight: Pounds,
    pub pressure_pct: Percent,
    pub progress_pct: Percent,
    pub fills_today: u32,
    pub total_lbs_today: Pounds,
    pub fill_number: u64,
    pub scale_online: bool,
    pub mqtt_connected: bool,
    /// `itv_feedback_active` in the original: the regulator's own
    /// "pressure-reached" line, surfaced for operators even though the
    /// control loop itself never reads it back (§4.2).
    pub pressure_feedback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stats: FillStats,
}

impl StatusReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: FillMode,
        zone: Option<Zone>,
        current_weight: Pounds,
        target_weight: Pounds,
        pressure_pct: Percent,
        fills_today: u32,
        total_lbs_today: Pounds,
        fill_number: u64,
        scale_online: bool,
        mqtt_connected: bool,
        pressure_feedback: bool,
        stats: FillStats,
    ) -> Self {
        let progress_pct = if target_weight > 0.0 {
            (100.0 * current_weight / target_weight).max(0.0)
        } else {
            0.0
        };
        let error = match mode {
            FillMode::Error(kind) => Some(kind.to_string()),
            _ => None,
        };
        StatusReport {
            state: mode.to_string(),
            zone: zone.map(|z| z.to_string()).unwrap_or_else(|| Zone::Idle.to_string()),
            current_weight,
            target_weight,
            pressure_pct,
            progress_pct,
            fills_today,
            total_lbs_today,
            fill_number,
            scale_online,
            mqtt_connected,
            pressure_feedback,
            error,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_zero_when_target_is_zero() {
        let report = StatusReport::new(
            FillMode::Idle,
            None,
            0.0,
            0.0,
            0.0,
            0,
            0.0,
            0,
            true,
            true,
            false,
            FillStats::default(),
        );
        assert_eq!(report.progress_pct, 0.0);
    }

    #[test]
    fn error_state_surfaces_its_message() {
        let report = StatusReport::new(
            FillMode::Error(crate::schemas::error::FillError::Overfill),
            None,
            105.0,
            100.0,
            0.0,
            0,
            0.0,
            1,
            true,
            true,
            false,
            FillStats::default(),
        );
        assert_eq!(report.error.as_deref(), Some("overfill"));
    }
}
