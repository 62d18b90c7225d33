//! The multi-zone pressure schedule (§4.5): a fixed, immutable table mapping
//! fill progress to a base pressure setpoint, a PID-adjustment cap, and a
//! gain multiplier. Implemented as a static lookup table per the "never a
//! dynamic registry" design note, not a trait-object dispatch table.

use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Zone {
    Idle,
    Fast,
    Moderate,
    Slow,
    Fine,
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Zone::Idle => "Idle",
            Zone::Fast => "Fast",
            Zone::Moderate => "Moderate",
            Zone::Slow => "Slow",
            Zone::Fine => "Fine",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneDescriptor {
    pub zone: Zone,
    pub upper_bound_pct_of_target: Percent,
    pub base_setpoint_pct: Percent,
    pub pid_range_pct: Percent,
    pub gain_multiplier: f32,
    /// target flow used by the hybrid controller's flow-tracking PID (§4.6 step 5)
    pub target_flow_lbs_per_s: PoundsPerSecond,
}

/// Ordered so that the first entry whose `upper_bound` exceeds the current
/// progress is the selected zone. This spec adopts the corrected table
/// (§9's first open question resolves in favor of this one, not the
/// original firmware's looser 40/70/90/98 split).
pub const ZONE_TABLE: [ZoneDescriptor; 4] = [
    ZoneDescriptor {
        zone: Zone::Fast,
        upper_bound_pct_of_target: 60.0,
        base_setpoint_pct: 33.0,
        pid_range_pct: 8.0,
        gain_multiplier: 1.5,
        target_flow_lbs_per_s: 3.0,
    },
    ZoneDescriptor {
        zone: Zone::Moderate,
        upper_bound_pct_of_target: 85.0,
        base_setpoint_pct: 66.0,
        pid_range_pct: 16.0,
        gain_multiplier: 1.0,
        target_flow_lbs_per_s: 2.0,
    },
    ZoneDescriptor {
        zone: Zone::Slow,
        upper_bound_pct_of_target: 97.5,
        base_setpoint_pct: 100.0,
        pid_range_pct: 13.0,
        gain_multiplier: 0.7,
        target_flow_lbs_per_s: 1.0,
    },
    ZoneDescriptor {
        zone: Zone::Fine,
        upper_bound_pct_of_target: 100.0,
        base_setpoint_pct: 83.0,
        pid_range_pct: 16.0,
        gain_multiplier: 0.4,
        target_flow_lbs_per_s: 0.3,
    },
];

/// Selects a zone from fill progress, or `None` when the fill is complete
/// (progress >= 100%).
pub fn select(progress_pct: Percent) -> Option<ZoneDescriptor> {
    if progress_pct >= 100.0 {
        return None;
    }
    ZONE_TABLE
        .iter()
        .find(|z| progress_pct < z.upper_bound_pct_of_target)
        .copied()
        .or_else(|| ZONE_TABLE.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_fast_near_zero() {
        assert_eq!(select(0.0).unwrap().zone, Zone::Fast);
        assert_eq!(select(59.9).unwrap().zone, Zone::Fast);
    }

    #[test]
    fn selects_each_zone_in_order() {
        assert_eq!(select(60.0).unwrap().zone, Zone::Moderate);
        assert_eq!(select(85.0).unwrap().zone, Zone::Slow);
        assert_eq!(select(97.5).unwrap().zone, Zone::Fine);
    }

    #[test]
    fn complete_at_or_above_100() {
        assert!(select(100.0).is_none());
        assert!(select(150.0).is_none());
    }

    #[test]
    fn selected_upper_bound_always_strictly_exceeds_progress() {
        for tenth in 0..1000 {
            let progress = tenth as f32 / 10.0;
            if let Some(z) = select(progress) {
                assert!(z.upper_bound_pct_of_target > progress);
            }
        }
    }
}
