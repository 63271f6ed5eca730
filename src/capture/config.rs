//! Capture constraints and scanner configuration.
//!
//! Devices differ widely in the resolutions and facing modes they accept,
//! so capture is described as an ordered list of constraints tried one
//! after another rather than a single fixed request.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user.
    #[default]
    Environment,
    /// Front camera.
    User,
    /// Whatever the platform hands out.
    Any,
}

/// Label keywords marking a rear-facing device.
pub const REAR_LABEL_KEYWORDS: &[&str] = &["back", "rear", "environment"];

/// Label keywords marking a front-facing device.
pub const FRONT_LABEL_KEYWORDS: &[&str] = &["front", "user", "facetime", "selfie"];

impl FacingMode {
    /// Reads the facing from a device label.
    ///
    /// `None` when the label is blank, names neither side or names both.
    pub fn from_label(label: &str) -> Option<FacingMode> {
        let label = label.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| label.contains(k));
        match (mentions(REAR_LABEL_KEYWORDS), mentions(FRONT_LABEL_KEYWORDS)) {
            (true, false) => Some(FacingMode::Environment),
            (false, true) => Some(FacingMode::User),
            _ => None,
        }
    }
}

/// Bounds for one resolution axis, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRange {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

impl DimensionRange {
    pub const fn new(min: u32, ideal: u32, max: u32) -> Self {
        Self { min, ideal, max }
    }

    /// Returns true if `value` lies within `[min, max]`.
    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min == 0 || self.min > self.max {
            return Err(ConfigError::InvalidDimensions);
        }
        if !self.contains(self.ideal) {
            return Err(ConfigError::IdealOutOfBounds);
        }
        Ok(())
    }
}

/// One entry of the prioritized capture request list.
///
/// A constraint without `width`/`height` accepts any resolution the
/// device offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraint {
    #[serde(default)]
    pub facing: FacingMode,
    #[serde(default)]
    pub width: Option<DimensionRange>,
    #[serde(default)]
    pub height: Option<DimensionRange>,
}

impl CaptureConstraint {
    /// Requests a facing mode with no resolution bounds.
    pub fn facing(facing: FacingMode) -> Self {
        Self {
            facing,
            width: None,
            height: None,
        }
    }

    /// Adds resolution bounds to the constraint.
    pub fn with_resolution(mut self, width: DimensionRange, height: DimensionRange) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Returns the preferred resolution, if the constraint names one.
    pub fn ideal_resolution(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w.ideal, h.ideal)),
            _ => None,
        }
    }

    /// Checks whether a delivered resolution satisfies the bounds.
    pub fn accepts_resolution(&self, width: u32, height: u32) -> bool {
        self.width.map_or(true, |r| r.contains(width))
            && self.height.map_or(true, |r| r.contains(height))
    }

    /// False only when the device label clearly faces the other way.
    pub fn accepts_facing(&self, label: &str) -> bool {
        match (self.facing, FacingMode::from_label(label)) {
            (FacingMode::Any, _) | (_, None) => true,
            (wanted, Some(actual)) => wanted == actual,
        }
    }

    /// Validates the constraint parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(w) = &self.width {
            w.validate()?;
        }
        if let Some(h) = &self.height {
            h.validate()?;
        }
        Ok(())
    }

    /// The fallback list used when no configuration is supplied.
    pub fn default_fallbacks() -> Vec<CaptureConstraint> {
        vec![
            CaptureConstraint::facing(FacingMode::Environment).with_resolution(
                DimensionRange::new(320, 640, 1920),
                DimensionRange::new(240, 480, 1080),
            ),
            CaptureConstraint::facing(FacingMode::Environment),
            CaptureConstraint::facing(FacingMode::Any),
        ]
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("ideal resolution lies outside its min/max bounds")]
    IdealOutOfBounds,
    #[error("at least one capture constraint is required")]
    NoConstraints,
    #[error("tick interval must be non-zero")]
    InvalidTickInterval,
    #[error("invalid domestic prefix range {start}..={end}")]
    InvalidPrefixRange { start: u16, end: u16 },
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Camera acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Constraints tried in order until one is accepted.
    pub constraints: Vec<CaptureConstraint>,
    /// Gives up on further constraints once this much time has passed (0 = never).
    pub acquisition_timeout_ms: u64,
    /// Label keywords marking a rear-facing device.
    pub preferred_labels: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraint::default_fallbacks(),
            acquisition_timeout_ms: 0,
            preferred_labels: REAR_LABEL_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl CaptureConfig {
    pub fn acquisition_timeout(&self) -> Option<Duration> {
        (self.acquisition_timeout_ms > 0).then(|| Duration::from_millis(self.acquisition_timeout_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.constraints.is_empty() {
            return Err(ConfigError::NoConstraints);
        }
        self.constraints.iter().try_for_each(CaptureConstraint::validate)
    }
}

/// Frame scan loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Pacing of the tick source in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum spacing between accepted decode candidates.
    pub candidate_throttle_ms: u64,
    /// Decodes slower than this are reported.
    pub decode_budget_ms: u64,
    /// Retry each missed frame with inverted polarity.
    pub try_inverted: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 33, // ~30 Hz
            candidate_throttle_ms: 100,
            decode_budget_ms: 50,
            try_inverted: true,
        }
    }
}

impl ScanConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn candidate_throttle(&self) -> Duration {
        Duration::from_millis(self.candidate_throttle_ms)
    }

    pub fn decode_budget(&self) -> Duration {
        Duration::from_millis(self.decode_budget_ms)
    }
}

/// Code validator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// First GS1 prefix (three digits) considered domestic.
    pub domestic_prefix_start: u16,
    /// Last GS1 prefix considered domestic, inclusive.
    pub domestic_prefix_end: u16,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        // 590 is GS1 Poland
        Self {
            domestic_prefix_start: 590,
            domestic_prefix_end: 590,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { metrics_port: 0 }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScannerConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl ScannerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScannerConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        if self.scan.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        let (start, end) = (
            self.validation.domestic_prefix_start,
            self.validation.domestic_prefix_end,
        );
        if start > end || end > 999 {
            return Err(ConfigError::InvalidPrefixRange { start, end });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.constraints.len(), 3);
        assert!(config.capture.acquisition_timeout().is_none());
    }

    #[test]
    fn test_empty_constraint_list_invalid() {
        let mut config = ScannerConfig::default();
        config.capture.constraints.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoConstraints)));
    }

    #[test]
    fn test_ideal_outside_bounds_invalid() {
        let constraint = CaptureConstraint::facing(FacingMode::Any).with_resolution(
            DimensionRange::new(320, 2000, 1920),
            DimensionRange::new(240, 480, 1080),
        );
        assert!(matches!(
            constraint.validate(),
            Err(ConfigError::IdealOutOfBounds)
        ));
    }

    #[test]
    fn test_accepts_resolution() {
        let constraint = &CaptureConstraint::default_fallbacks()[0];
        assert!(constraint.accepts_resolution(640, 480));
        assert!(!constraint.accepts_resolution(160, 120));
        assert!(CaptureConstraint::facing(FacingMode::Any).accepts_resolution(1, 1));
    }

    #[test]
    fn test_facing_from_label() {
        assert_eq!(FacingMode::from_label("Back Camera"), Some(FacingMode::Environment));
        assert_eq!(FacingMode::from_label("FaceTime HD Camera"), Some(FacingMode::User));
        assert_eq!(FacingMode::from_label("USB Video Device"), None);
        assert_eq!(FacingMode::from_label(""), None);
    }

    #[test]
    fn test_accepts_facing() {
        let rear = CaptureConstraint::facing(FacingMode::Environment);
        let front = CaptureConstraint::facing(FacingMode::User);

        assert!(rear.accepts_facing("camera2 0, facing back"));
        assert!(!rear.accepts_facing("Front Camera"));
        assert!(!front.accepts_facing("Mock Back Camera"));
        // Unlabelled devices are given the benefit of the doubt.
        assert!(front.accepts_facing(""));
        assert!(CaptureConstraint::facing(FacingMode::Any).accepts_facing("Front Camera"));
    }

    #[test]
    fn test_parse_toml() {
        let config = ScannerConfig::from_toml(
            r#"
            [capture]
            acquisition_timeout_ms = 5000
            preferred_labels = ["back"]

            [[capture.constraints]]
            facing = "environment"
            width = { min = 640, ideal = 1280, max = 1920 }
            height = { min = 480, ideal = 720, max = 1080 }

            [[capture.constraints]]
            facing = "any"

            [scan]
            tick_interval_ms = 16
            candidate_throttle_ms = 100
            decode_budget_ms = 40
            try_inverted = false
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.constraints.len(), 2);
        assert_eq!(
            config.capture.constraints[0].ideal_resolution(),
            Some((1280, 720))
        );
        assert_eq!(config.capture.constraints[1].facing, FacingMode::Any);
        assert_eq!(
            config.capture.acquisition_timeout(),
            Some(Duration::from_secs(5))
        );
        assert!(!config.scan.try_inverted);
        assert_eq!(config.validation.domestic_prefix_start, 590);
    }

    #[test]
    fn test_zero_tick_interval_invalid() {
        let result = ScannerConfig::from_toml("[scan]\ntick_interval_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidTickInterval)));
    }
}
