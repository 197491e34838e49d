//! radpick-core: horizon picking on draped radargrams (sans-IO).
//!
//! A radargram is a radar image texture-mapped onto a curved flightline
//! mesh. This crate lets an operator trace a reflection horizon on it:
//!
//! - [`mapping`] converts between the image's UV space and world space
//!   through the triangulated mesh;
//! - [`HorizonTracer`] follows a brightness ridge across the texture
//!   between two picked points;
//! - [`UniformSampler`] draws a straight, evenly resampled path instead;
//! - [`PickingSession`] turns pointer hits into committed points and
//!   stitched segments, driven by [`run_sampling_loop`].
//!
//! This crate has **no I/O dependencies**. Rendering, pointer input and
//! file output are reached through the [`PickingHost`], [`PointerSource`]
//! and [`Sleeper`] traits.

#![warn(missing_docs)]

pub mod config;
pub mod diagnostics;
pub mod geometry;
pub mod mapping;
pub mod mesh;
pub mod sampler;
pub mod sampling;
pub mod segment;
pub mod session;
pub mod surface;
pub mod texture;
pub mod tracer;

pub use config::{Axis, ConfigError, SessionConfig, TracerConfig};
pub use diagnostics::{Clock, TraceDiagnostics};
pub use mesh::{Mesh, MeshError};
pub use sampler::{SampleError, UniformSampler};
pub use sampling::{CancelToken, PointerSource, Sleeper, ThreadSleeper, run_sampling_loop};
pub use segment::{Segment, SegmentError, SegmentGenerator, SegmentRequest, SegmentStrategy};
pub use session::{
    AxisKey, FinishedPick, OutgoingSegment, PickPoint, PickingHost, PickingSession, SessionState,
    TickOutcome, VisualHandle,
};
pub use surface::{PointerHit, RadargramSurface, SurfaceId, SurfaceOrientation};
pub use texture::{Texel, Texture, TextureError, TracerImage};
pub use tracer::{HorizonTrace, HorizonTracer, ScanDirection, TraceError};
