//! Session and tracer configuration.
//!
//! Every field has a default matching the picking tool's shipped
//! behaviour, so a config deserialized from partial JSON is always
//! complete. Values are not checked on construction; call
//! [`SessionConfig::validate`] before starting a session.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::segment::SegmentStrategy;

/// Errors raised by [`SessionConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
}

/// World axis used as the ordering key of committed points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Axis {
    /// Flightlines run mostly along world X.
    #[default]
    X,
    /// Flightlines run mostly along world Y.
    Y,
    /// Flightlines run mostly along world Z.
    Z,
}

impl Axis {
    /// The component of `v` along this axis.
    #[must_use]
    pub const fn component(self, v: Vec3) -> f32 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
        }
    }
}

/// Parameters of the guided horizon tracer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Rows searched above and below the interpolated target row.
    pub window_half_height: u32,

    /// World direction the hit normal is compared against to decide
    /// which way the tracer scans.
    pub reference_forward: Vec3,
}

impl TracerConfig {
    /// Default for [`window_half_height`](Self::window_half_height).
    pub const DEFAULT_WINDOW_HALF_HEIGHT: u32 = 10;
    /// Default for [`reference_forward`](Self::reference_forward).
    pub const DEFAULT_REFERENCE_FORWARD: Vec3 = Vec3::Z;
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            window_half_height: Self::DEFAULT_WINDOW_HALF_HEIGHT,
            reference_forward: Self::DEFAULT_REFERENCE_FORWARD,
        }
    }
}

/// Configuration of a [`PickingSession`](crate::PickingSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum distance along `sweep_axis`, in world units, between the
    /// last committed point and a candidate before it is committed (or,
    /// moving backwards, before the last point is retracted).
    pub commit_threshold: f32,

    /// Dominant axis of the flightline.
    pub sweep_axis: Axis,

    /// Texels between consecutive guided samples.
    pub guided_stride: u32,

    /// Local-space distance between consecutive unguided samples.
    pub unguided_interval: f32,

    /// Pause between pointer samples in the sampling loop.
    pub tick_interval_ms: u64,

    /// Strategy used for segments when the session starts.
    pub strategy: SegmentStrategy,

    /// Snap candidate points to the centre of their texel.
    pub snap_to_texels: bool,

    /// Ask the host to show a marker at every committed point.
    pub show_debug_points: bool,

    /// Hand each guided trace to the host for debug-image export.
    pub export_debug_images: bool,

    /// Guided tracer parameters.
    pub tracer: TracerConfig,
}

impl SessionConfig {
    /// Default for [`commit_threshold`](Self::commit_threshold).
    pub const DEFAULT_COMMIT_THRESHOLD: f32 = 0.05;
    /// Default for [`guided_stride`](Self::guided_stride).
    pub const DEFAULT_GUIDED_STRIDE: u32 = 10;
    /// Default for [`unguided_interval`](Self::unguided_interval).
    pub const DEFAULT_UNGUIDED_INTERVAL: f32 = 5.0;
    /// Default for [`tick_interval_ms`](Self::tick_interval_ms).
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.commit_threshold.is_finite() && self.commit_threshold > 0.0) {
            return Err(ConfigError::InvalidConfig(format!(
                "commit_threshold must be positive and finite, got {}",
                self.commit_threshold
            )));
        }
        if self.guided_stride == 0 {
            return Err(ConfigError::InvalidConfig(
                "guided_stride must be at least 1".to_string(),
            ));
        }
        if !(self.unguided_interval.is_finite() && self.unguided_interval > 0.0) {
            return Err(ConfigError::InvalidConfig(format!(
                "unguided_interval must be positive and finite, got {}",
                self.unguided_interval
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        let forward = self.tracer.reference_forward;
        if !forward.is_finite() || forward.length_squared() == 0.0 {
            return Err(ConfigError::InvalidConfig(format!(
                "tracer.reference_forward must be a finite non-zero vector, got {forward}"
            )));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            commit_threshold: Self::DEFAULT_COMMIT_THRESHOLD,
            sweep_axis: Axis::default(),
            guided_stride: Self::DEFAULT_GUIDED_STRIDE,
            unguided_interval: Self::DEFAULT_UNGUIDED_INTERVAL,
            tick_interval_ms: Self::DEFAULT_TICK_INTERVAL_MS,
            strategy: SegmentStrategy::default(),
            snap_to_texels: true,
            show_debug_points: false,
            export_debug_images: false,
            tracer: TracerConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SessionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn defaults_match_constants() {
        let config = SessionConfig::default();
        assert!((config.commit_threshold - 0.05).abs() < f32::EPSILON);
        assert_eq!(config.guided_stride, 10);
        assert!((config.unguided_interval - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.strategy, SegmentStrategy::Guided);
        assert_eq!(config.sweep_axis, Axis::X);
        assert_eq!(config.tracer.window_half_height, 10);
        assert_eq!(config.tracer.reference_forward, Vec3::Z);
    }

    #[test]
    fn validate_rejects_non_positive_threshold() {
        let config = SessionConfig {
            commit_threshold: 0.0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(ref s)) if s.contains("commit_threshold")));
    }

    #[test]
    fn validate_rejects_zero_stride() {
        let config = SessionConfig {
            guided_stride: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan_interval() {
        let config = SessionConfig {
            unguided_interval: f32::NAN,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_forward() {
        let mut config = SessionConfig::default();
        config.tracer.reference_forward = Vec3::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn axis_component_selects_coordinate() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!((Axis::X.component(v) - 1.0).abs() < f32::EPSILON);
        assert!((Axis::Y.component(v) - 2.0).abs() < f32::EPSILON);
        assert!((Axis::Z.component(v) - 3.0).abs() < f32::EPSILON);
    }

    // --- serde ---

    #[test]
    fn json_round_trip() {
        let config = SessionConfig {
            sweep_axis: Axis::Z,
            strategy: SegmentStrategy::Unguided,
            export_debug_images: true,
            ..SessionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"guided_stride": 4, "tracer": {"window_half_height": 3}}"#)
                .unwrap();
        assert_eq!(config.guided_stride, 4);
        assert_eq!(config.tracer.window_half_height, 3);
        assert_eq!(config.tracer.reference_forward, Vec3::Z);
        assert_eq!(config.tick_interval_ms, SessionConfig::DEFAULT_TICK_INTERVAL_MS);
    }
}
