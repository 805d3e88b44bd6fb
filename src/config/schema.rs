//! Configuration schema
//!
//! Serde types for the funnel YAML configuration. Every section is optional
//! and defaults to the stock funnel: a five minute reveal delay, 439 viewers,
//! 20 spots, and the 20-name social proof catalogue.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default catalogue of social proof display names.
pub const DEFAULT_NAMES: [&str; 20] = [
    "Guadalupe",
    "María",
    "Valentina",
    "Isabella",
    "Camila",
    "Sofia",
    "Ana Paula",
    "Luciana",
    "Carolina",
    "Fernanda",
    "Mariana",
    "Daniela",
    "Gabriela",
    "Victoria",
    "Andrea",
    "Alejandra",
    "Patricia",
    "Rosa",
    "Carmen",
    "Laura",
];

/// Root funnel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FunnelConfig {
    /// Seed for the session RNG; entropy when absent
    pub seed: Option<u64>,
    /// Reveal state machine timing
    pub reveal: RevealConfig,
    /// Viewer walk and scarcity countdown
    pub urgency: UrgencyConfig,
    /// Social proof rotation
    pub social_proof: SocialProofConfig,
    /// City lookup
    pub geolocation: GeolocationConfig,
    /// Outbound contact destination
    pub contact: ContactConfig,
    /// Seen-flag storage
    pub storage: StorageConfig,
}

/// Reveal timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealConfig {
    /// Delay between "play" and reveal
    #[serde(with = "duration_str")]
    pub delay: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5 * 60),
        }
    }
}

/// Urgency counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrgencyConfig {
    /// Initial viewer count
    pub viewer_seed: i64,
    /// Viewer walk tick period
    #[serde(with = "duration_str")]
    pub viewer_period: Duration,
    /// Initial remaining spots
    pub spots_seed: u32,
    /// Scarcity countdown tick period
    #[serde(with = "duration_str")]
    pub spots_period: Duration,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            viewer_seed: 439,
            viewer_period: Duration::from_millis(3000),
            spots_seed: 20,
            spots_period: Duration::from_millis(2000),
        }
    }
}

/// Social proof notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocialProofConfig {
    /// Cadence between notifications
    #[serde(with = "duration_str")]
    pub period: Duration,
    /// How long each notification stays visible
    #[serde(with = "duration_str")]
    pub visible_for: Duration,
    /// Name pool
    pub names: Vec<String>,
}

impl Default for SocialProofConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(3000),
            visible_for: Duration::from_millis(2000),
            names: DEFAULT_NAMES.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Geolocation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeolocationConfig {
    /// JSON endpoint returning an object with a `city` field
    pub endpoint: String,
    /// Give up after this long
    #[serde(with = "duration_str")]
    pub timeout: Duration,
    /// Shown when the lookup fails
    pub fallback_city: String,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ipapi.co/json/".to_string(),
            timeout: Duration::from_secs(5),
            fallback_city: "su ciudad".to_string(),
        }
    }
}

/// Outbound contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactConfig {
    /// Destination opened by CTA and exit-modal actions
    pub destination: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            destination: "https://wa.me/0000000000".to_string(),
        }
    }
}

/// Seen-flag storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// JSON key-value file holding the flag
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".revealgate/state.json"),
        }
    }
}

/// Serde adapter for humantime duration strings (`"3s"`, `"250ms"`, `"5m"`).
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a duration as a humantime string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// Deserializes a humantime string into a duration.
    ///
    /// # Errors
    ///
    /// Returns a custom error when the string is not a valid duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
