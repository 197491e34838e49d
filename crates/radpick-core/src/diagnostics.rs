//! Trace diagnostics: timing and sample counts for one guided trace.
//!
//! Collected by
//! [`HorizonTracer::trace_with_diagnostics`](crate::HorizonTracer::trace_with_diagnostics)
//! for tuning the window height and stride against real radargrams.
//!
//! Timing goes through the [`Clock`] trait so the library stays free of
//! platform clocks; the CLI implements it with `std::time::Instant`.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tracer::ScanDirection;

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single guided trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDiagnostics {
    /// Wall-clock duration of the trace (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Texture width in texels.
    pub texture_width: u32,
    /// Texture height in texels.
    pub texture_height: u32,
    /// Which way the columns were scanned.
    pub direction: ScanDirection,
    /// Column distance between the two endpoints.
    pub span: u32,
    /// Texels between samples.
    pub stride: u32,
    /// Samples the tracer produced (`span / stride + 1`).
    pub samples: usize,
    /// Samples that mapped onto the mesh.
    pub emitted: usize,
    /// Samples dropped because they fell off the mesh.
    pub dropped: usize,
}

impl TraceDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Trace Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Texture: {}x{}",
            self.texture_width, self.texture_height
        ));
        lines.push(format!(
            "Duration: {:.3}ms",
            self.duration.as_secs_f64() * 1000.0
        ));
        lines.push(format!(
            "Direction: {}  |  Span: {} columns  |  Stride: {}",
            self.direction, self.span, self.stride
        ));
        lines.push(format!(
            "Samples: {}  |  On mesh: {}  |  Dropped: {}",
            self.samples, self.emitted, self.dropped
        ));

        lines.join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> TraceDiagnostics {
        TraceDiagnostics {
            duration: Duration::from_millis(1500),
            texture_width: 640,
            texture_height: 200,
            direction: ScanDirection::DecreasingColumn,
            span: 90,
            stride: 10,
            samples: 10,
            emitted: 9,
            dropped: 1,
        }
    }

    #[test]
    fn report_mentions_counts() {
        let report = sample().report();
        assert!(report.contains("640x200"));
        assert!(report.contains("1500.000ms"));
        assert!(report.contains("Dropped: 1"));
    }

    #[test]
    fn duration_serializes_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["duration"].as_f64().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn serde_round_trip() {
        let diagnostics = sample();
        let json = serde_json::to_string(&diagnostics).unwrap();
        let back: TraceDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diagnostics);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<TraceDiagnostics>(json).is_err());
    }
}
