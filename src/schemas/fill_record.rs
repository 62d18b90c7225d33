use crate::types::*;
use serde::{Deserialize, Serialize};

/// Published once per fill completion to the `.../fills` topic at QoS 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub fill_number: u64,
    pub target_lbs: Pounds,
    pub final_lbs: Pounds,
    pub zone_transitions: u32,
    pub elapsed_ms: u64,
}

impl FillRecord {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

/// Lifetime running averages, recomputed on every fill-completion commit
/// (`system_state.h`'s `avg_fill_time_ms`/`avg_error_lbs`/`avg_pressure_pct`,
/// never actually populated by the observed C control path). Scoped to
/// `fill_number` rather than the calendar-day counters, since `fill_number`
/// is the one counter this crate persists across restarts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FillStats {
    pub avg_fill_time_ms: f32,
    pub avg_error_lbs: f32,
    pub avg_pressure_pct: f32,
}

impl FillStats {
    /// Folds one more completed fill into the running means. `count` is the
    /// fill's 1-based ordinal (`fill_number` after incrementing).
    pub fn record(&mut self, count: u64, fill_time_ms: u64, error_lbs: f32, avg_pressure_pct: f32) {
        let n = count as f32;
        self.avg_fill_time_ms += (fill_time_ms as f32 - self.avg_fill_time_ms) / n;
        self.avg_error_lbs += (error_lbs - self.avg_error_lbs) / n;
        self.avg_pressure_pct += (avg_pressure_pct - self.avg_pressure_pct) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_average_matches_plain_mean_after_a_few_fills() {
        let mut stats = FillStats::default();
        stats.record(1, 1000, 1.0, 50.0);
        stats.record(2, 2000, 3.0, 60.0);
        stats.record(3, 3000, 2.0, 70.0);
        assert!((stats.avg_fill_time_ms - 2000.0).abs() < 1e-2);
        assert!((stats.avg_error_lbs - 2.0).abs() < 1e-4);
        assert!((stats.avg_pressure_pct - 60.0).abs() < 1e-2);
    }
}
