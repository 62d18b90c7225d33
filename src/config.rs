use crate::kv_store::*;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub pid: Pid,
    pub fill: Fill,
    pub safety: Safety,
    pub autotune: Autotune,
    pub mqtt: Mqtt,
}

impl Config {
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load config: {:?}, creating a default", e);
                let cfg = Self::default();
                if let Err(e) = cfg.save() {
                    log::error!("Failed to save default config: {:?}", e);
                }
                cfg
            }
        }
    }

    pub fn try_load() -> Result<Self, Error> {
        let fs = KeyValueStore::new().map_err(Error::NotFound)?;
        match FileType::Config.load(&fs)? {
            File::Config(config) => Ok(config),
            #[allow(unreachable_patterns)]
            _ => Err(Error::NotFound("Config".to_string())),
        }
    }

    pub fn save(&self) -> Result<(), Error> {
        let mut fs = KeyValueStore::new().map_err(Error::NotFound)?;
        File::Config(self.clone()).save(&mut fs)
    }

    pub fn update(&mut self, new: Config) -> Result<(), Error> {
        *self = new;
        self.save()
    }
}

/// Default PID gains and output/anti-windup limits.
///
/// `integral_min`/`integral_max` match the original firmware's hand-tuned
/// anti-windup band; they are not derived from the auto-tune result, which
/// only ever writes `kp`/`ki`/`kd`.
#[derive(Serialize, Deserialize, Copy, Clone)]
pub struct Pid {
    pub default_kp: f32,
    pub default_ki: f32,
    pub default_kd: f32,
    pub output_min: Percent,
    pub output_max: Percent,
    pub integral_min: f32,
    pub integral_max: f32,
}

impl Default for Pid {
    fn default() -> Self {
        const DEFAULT_KP: f32 = 2.5;
        const DEFAULT_KI: f32 = 0.5;
        const DEFAULT_KD: f32 = 0.1;
        const OUTPUT_MIN: Percent = 0.0;
        const OUTPUT_MAX: Percent = 100.0;
        const INTEGRAL_MIN: f32 = -50.0;
        const INTEGRAL_MAX: f32 = 50.0;

        Pid {
            default_kp: DEFAULT_KP,
            default_ki: DEFAULT_KI,
            default_kd: DEFAULT_KD,
            output_min: OUTPUT_MIN,
            output_max: OUTPUT_MAX,
            integral_min: INTEGRAL_MIN,
            integral_max: INTEGRAL_MAX,
        }
    }
}

#[derive(Serialize, Deserialize, Copy, Clone)]
pub struct Fill {
    pub min_target_lbs: Pounds,
    pub max_target_lbs: Pounds,
    pub default_target_lbs: Pounds,
    pub target_increment_lbs: Pounds,
    pub overfill_ratio: f32,
    pub scale_unavailable_ticks: u32,
    pub weight_stuck_ticks: u32,
    pub weight_stuck_epsilon_lbs: Pounds,
    /// §4.6 step 8: when false, the Control task commands `base_setpoint_pct`
    /// directly and skips the flow-tracking PID correction (pure zone mode).
    pub pid_enabled: bool,
}

impl Default for Fill {
    fn default() -> Self {
        const MIN_TARGET_WEIGHT_LBS: Pounds = 10.0;
        const MAX_TARGET_WEIGHT_LBS: Pounds = 250.0;
        const DEFAULT_TARGET_WEIGHT_LBS: Pounds = 200.0;
        const WEIGHT_INCREMENT_LBS: Pounds = 5.0;
        const OVERFILL_RATIO: f32 = 1.02;
        // 2s at the 100ms control rate, recommended window from the error spec
        const SCALE_UNAVAILABLE_TICKS: u32 = 20;
        const WEIGHT_STUCK_TICKS: u32 = 20;
        const WEIGHT_STUCK_EPSILON_LBS: Pounds = 0.05;

        Fill {
            min_target_lbs: MIN_TARGET_WEIGHT_LBS,
            max_target_lbs: MAX_TARGET_WEIGHT_LBS,
            default_target_lbs: DEFAULT_TARGET_WEIGHT_LBS,
            target_increment_lbs: WEIGHT_INCREMENT_LBS,
            overfill_ratio: OVERFILL_RATIO,
            scale_unavailable_ticks: SCALE_UNAVAILABLE_TICKS,
            weight_stuck_ticks: WEIGHT_STUCK_TICKS,
            weight_stuck_epsilon_lbs: WEIGHT_STUCK_EPSILON_LBS,
            pid_enabled: true,
        }
    }
}

#[derive(Serialize, Deserialize, Copy, Clone)]
pub struct Safety {
    pub stage_timeout: Duration,
}

impl Default for Safety {
    fn default() -> Self {
        const SAFETY_CHECK_TIMEOUT: Duration = Duration::from_secs(30);
        Safety {
            stage_timeout: SAFETY_CHECK_TIMEOUT,
        }
    }
}

#[derive(Serialize, Deserialize, Copy, Clone)]
pub struct Autotune {
    pub target_weight_lbs: Pounds,
    pub setpoint_pct: Percent,
    pub timeout: Duration,
    pub step_percent: Percent,
    pub min_oscillations: usize,
}

impl Default for Autotune {
    fn default() -> Self {
        const AUTOTUNE_TARGET_WEIGHT: Pounds = 50.0;
        const AUTOTUNE_SETPOINT_PCT: Percent = 50.0;
        const AUTOTUNE_TIMEOUT: Duration = Duration::from_secs(120);
        const AUTOTUNE_STEP_PERCENT: Percent = 20.0;
        const AUTOTUNE_MIN_OSCILLATIONS: usize = 3;

        Autotune {
            target_weight_lbs: AUTOTUNE_TARGET_WEIGHT,
            setpoint_pct: AUTOTUNE_SETPOINT_PCT,
            timeout: AUTOTUNE_TIMEOUT,
            step_percent: AUTOTUNE_STEP_PERCENT,
            min_oscillations: AUTOTUNE_MIN_OSCILLATIONS,
        }
    }
}

/// Topic naming and publish cadence for the abstract event sink (§6). No
/// broker credentials are kept here: the sink is modelled as a trait
/// (`ports::event_sink`), not a live MQTT client.
#[derive(Serialize, Deserialize, Clone)]
pub struct Mqtt {
    pub status_interval_filling: Duration,
    pub status_interval_idle: Duration,
    pub status_topic: String,
    pub fills_topic: String,
    pub events_topic: String,
}

impl Default for Mqtt {
    fn default() -> Self {
        const STATUS_INTERVAL_FILLING: Duration = Duration::from_secs(5);
        const STATUS_INTERVAL_IDLE: Duration = Duration::from_secs(30);
        let device_id = std::env::var("PUMP_DEVICE_ID").unwrap_or_else(|_| "pump_01".to_string());

        Mqtt {
            status_interval_filling: STATUS_INTERVAL_FILLING,
            status_interval_idle: STATUS_INTERVAL_IDLE,
            status_topic: format!("factory/pump/{}/status", device_id),
            fills_topic: format!("factory/pump/{}/fills", device_id),
            events_topic: format!("factory/pump/{}/events", device_id),
        }
    }
}
