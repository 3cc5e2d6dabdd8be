use std::time::Duration;

use harvester_core::HarvestLimits;
use serde::{Deserialize, Serialize};

use crate::{CascadeStep, ClientProfile, EndpointVariant};

/// Default attempt order: both identities against the primary endpoint, then the fallback endpoint.
pub const DEFAULT_CASCADE: [CascadeStep; 4] = [
    CascadeStep::new(ClientProfile::Web, EndpointVariant::Next),
    CascadeStep::new(ClientProfile::Android, EndpointVariant::Next),
    CascadeStep::new(ClientProfile::Web, EndpointVariant::Browse),
    CascadeStep::new(ClientProfile::Android, EndpointVariant::Browse),
];

/// Tunables for one harvest. Every field is optional in config files; durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    pub max_records: usize,
    #[serde(rename = "hard_stop_ms", with = "millis")]
    pub hard_stop: Duration,
    #[serde(rename = "idle_timeout_ms", with = "millis")]
    pub idle_timeout: Duration,
    #[serde(rename = "throttle_ms", with = "millis")]
    pub throttle: Duration,
    pub step_guard: usize,
    pub zero_progress_threshold: usize,
    pub boot: BootPolicy,
    #[serde(rename = "observe_window_ms", with = "millis")]
    pub observe_window: Duration,
    /// Drain continuations even when a params-seeded first page already carries records.
    pub force_drain: bool,
    pub cascade: Vec<CascadeStep>,
    pub fetch: FetchSettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let limits = HarvestLimits::default();
        Self {
            max_records: limits.max_records,
            hard_stop: limits.hard_stop,
            idle_timeout: limits.idle_timeout,
            throttle: Duration::from_millis(120),
            step_guard: limits.step_guard,
            zero_progress_threshold: limits.zero_progress_threshold,
            boot: BootPolicy::default(),
            observe_window: Duration::from_millis(2_500),
            force_drain: true,
            cascade: DEFAULT_CASCADE.to_vec(),
            fetch: FetchSettings::default(),
        }
    }
}

impl HarvestConfig {
    pub fn limits(&self) -> HarvestLimits {
        HarvestLimits {
            max_records: self.max_records,
            hard_stop: self.hard_stop,
            idle_timeout: self.idle_timeout,
            step_guard: self.step_guard,
            zero_progress_threshold: self.zero_progress_threshold,
        }
    }
}

/// Retry budget for session context resolution: exponential backoff, capped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootPolicy {
    pub attempts: u32,
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    pub factor: f64,
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
}

impl Default for BootPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(450),
            factor: 1.6,
            max_delay: Duration::from_millis(1_500),
        }
    }
}

impl BootPolicy {
    /// Grows `current` by `factor`, capped at `max_delay`. A factor that overflows the
    /// clock lands on the cap.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.factor.max(1.0);
        Duration::try_from_secs_f64(scaled)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    pub base_url: String,
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
