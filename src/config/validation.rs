//! Configuration validation
//!
//! Semantic checks on a deserialized [`FunnelConfig`]. Validation collects
//! every issue instead of stopping at the first one.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::schema::FunnelConfig;
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Longest accepted duration for any timing: one year.
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &FunnelConfig) -> ValidationResult {
        self.issues.clear();

        self.validate_timings(config);
        self.validate_urgency(config);
        self.validate_name_pool(config);
        self.validate_collaborators(config);

        let (errors, warnings) = std::mem::take(&mut self.issues)
            .into_iter()
            .partition(|issue| issue.severity == Severity::Error);

        ValidationResult { errors, warnings }
    }

    // ========================================================================
    // Checks
    // ========================================================================

    fn validate_timings(&mut self, config: &FunnelConfig) {
        self.require_nonzero("urgency.viewer_period", config.urgency.viewer_period);
        self.require_nonzero("urgency.spots_period", config.urgency.spots_period);
        self.require_nonzero("social_proof.period", config.social_proof.period);
        self.require_nonzero("social_proof.visible_for", config.social_proof.visible_for);
        self.require_nonzero("geolocation.timeout", config.geolocation.timeout);

        // A zero reveal delay is legal: the reveal fires on the next scheduler turn.

        for (path, value) in [
            ("reveal.delay", config.reveal.delay),
            ("urgency.viewer_period", config.urgency.viewer_period),
            ("urgency.spots_period", config.urgency.spots_period),
            ("social_proof.period", config.social_proof.period),
            ("social_proof.visible_for", config.social_proof.visible_for),
            ("geolocation.timeout", config.geolocation.timeout),
        ] {
            self.require_bounded(path, value);
        }

        let proof = &config.social_proof;
        if !proof.period.is_zero() && proof.visible_for >= proof.period {
            self.issues.push(ValidationIssue::warning(
                "social_proof.visible_for",
                format!(
                    "visible window ({}) is not shorter than the cadence ({}); notifications will overlap",
                    humantime::format_duration(proof.visible_for),
                    humantime::format_duration(proof.period),
                ),
            ));
        }
    }

    fn validate_urgency(&mut self, config: &FunnelConfig) {
        if config.urgency.spots_seed < 1 {
            self.issues.push(ValidationIssue::error(
                "urgency.spots_seed",
                "must be at least 1",
            ));
        }
        if config.urgency.viewer_seed < 0 {
            self.issues.push(ValidationIssue::warning(
                "urgency.viewer_seed",
                "starts negative",
            ));
        }
    }

    fn validate_name_pool(&mut self, config: &FunnelConfig) {
        let names = &config.social_proof.names;
        if names.is_empty() {
            self.issues.push(ValidationIssue::error(
                "social_proof.names",
                "must not be empty",
            ));
            return;
        }

        let mut seen = HashSet::new();
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                self.issues.push(ValidationIssue::error(
                    format!("social_proof.names[{index}]"),
                    "must not be blank",
                ));
            } else if !seen.insert(name.as_str()) {
                self.issues.push(ValidationIssue::error(
                    format!("social_proof.names[{index}]"),
                    format!("duplicate name '{name}'"),
                ));
            }
        }
    }

    fn validate_collaborators(&mut self, config: &FunnelConfig) {
        if config.contact.destination.trim().is_empty() {
            self.issues.push(ValidationIssue::error(
                "contact.destination",
                "must not be empty",
            ));
        }
        if config.geolocation.fallback_city.trim().is_empty() {
            self.issues.push(ValidationIssue::warning(
                "geolocation.fallback_city",
                "is blank; failed lookups will show nothing",
            ));
        }
        if !config.geolocation.endpoint.starts_with("http://")
            && !config.geolocation.endpoint.starts_with("https://")
        {
            self.issues.push(ValidationIssue::error(
                "geolocation.endpoint",
                "must be an http(s) URL",
            ));
        }
    }

    fn require_bounded(&mut self, path: &str, value: Duration) {
        if value > MAX_DURATION {
            self.issues.push(ValidationIssue::error(
                path,
                format!(
                    "{} exceeds the maximum of {} days",
                    humantime::format_duration(value),
                    MAX_DURATION.as_secs() / 86_400,
                ),
            ));
        }
    }

    fn require_nonzero(&mut self, path: &str, value: Duration) {
        if value.is_zero() {
            self.issues
                .push(ValidationIssue::error(path, "must be greater than zero"));
        }
    }
}
