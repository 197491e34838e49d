//! The interactive picking session.
//!
//! A session turns a stream of pointer hits into a polyline along a
//! radargram horizon. While the trigger is held (Active), every tick maps
//! the hit onto the bound surface and compares its coordinate on the
//! sweep axis with the furthest committed point:
//!
//! - far enough ahead: commit it and generate the segment leading to it;
//! - far enough behind: retract the furthest point;
//! - otherwise: hold.
//!
//! Committed points are kept in a map keyed by the sweep-axis coordinate,
//! so they are always ordered and the furthest one is the last entry.
//! Each point owns the segment leading *out* of it; retracting a point
//! therefore also clears its predecessor's segment.
//!
//! Rendering is left to the host through [`PickingHost`]. Visuals of
//! retracted points are deactivated at once and destroyed when the
//! stroke finishes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SessionConfig};
use crate::mapping;
use crate::segment::{SegmentGenerator, SegmentRequest, SegmentStrategy};
use crate::surface::{PointerHit, RadargramSurface, SurfaceId};
use crate::tracer::HorizonTrace;

/// Points closer than this are merged when stitching the polyline.
const STITCH_EPSILON: f32 = 1e-6;

/// Opaque handle to something the host drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

/// Scene-side collaborator that renders and cleans up picking visuals.
///
/// Only [`draw_segment`](Self::draw_segment) is required; the remaining
/// hooks default to doing nothing.
pub trait PickingHost {
    /// Draw one segment as a polyline on `surface`.
    fn draw_segment(&mut self, surface: &RadargramSurface, points: &[Vec3]) -> Option<VisualHandle>;

    /// Place a marker at a committed point.
    fn spawn_marker(
        &mut self,
        _surface: &RadargramSurface,
        _position: Vec3,
        _visible: bool,
    ) -> Option<VisualHandle> {
        None
    }

    /// Hide a visual that will be destroyed later.
    fn deactivate(&mut self, _handle: VisualHandle) {}

    /// Destroy a visual.
    fn destroy(&mut self, _handle: VisualHandle) {}

    /// Collect the segments of a finished stroke under one container.
    fn group_segments(&mut self, _surface: &RadargramSurface, _segments: &[VisualHandle]) {}

    /// Receive a guided trace for debug-image export.
    fn export_debug_trace(&mut self, _surface: &RadargramSurface, _trace: &HorizonTrace) {}
}

/// Sweep-axis coordinate used as the ordering key of committed points.
#[derive(Debug, Clone, Copy)]
pub struct AxisKey(pub f32);

impl PartialEq for AxisKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AxisKey {}

impl PartialOrd for AxisKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AxisKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The drawn path leading out of a committed point.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingSegment {
    /// World-space path towards the next committed point.
    pub points: Vec<Vec3>,
    /// The host's visual for it, if one was drawn.
    pub handle: Option<VisualHandle>,
}

/// A committed point of the stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct PickPoint {
    /// World-space position on the surface.
    pub world: Vec3,
    /// UV coordinate on the surface.
    pub uv: Vec2,
    /// Surface normal of the hit that produced the point.
    pub normal: Vec3,
    /// Surface the point lies on.
    pub surface: SurfaceId,
    /// Debug marker, while the stroke is in progress.
    pub marker: Option<VisualHandle>,
    /// Segment towards the next committed point.
    pub outgoing: Option<OutgoingSegment>,
}

/// The result of a finished stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedPick {
    /// Surface the stroke was bound to, if any hit was sampled.
    pub surface: Option<SurfaceId>,
    /// Committed points in sweep-axis order.
    pub points: Vec<PickPoint>,
    /// All segments stitched into one continuous path.
    pub polyline: Vec<Vec3>,
}

/// Whether a stroke is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for [`PickingSession::press`].
    Idle,
    /// Sampling the pointer.
    Active,
}

/// What a single [`PickingSession::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session is idle.
    Inactive,
    /// The pointer hit nothing.
    NoHit,
    /// The bound surface does not accept picks.
    NotPickable,
    /// The hit could not be placed on the surface.
    Unmapped,
    /// The candidate is within the threshold band of the furthest point.
    Held,
    /// A point was committed.
    Committed {
        /// Sweep-axis coordinate of the new point.
        axis: f32,
        /// Length of the segment leading to it, if one was generated.
        segment_points: Option<usize>,
    },
    /// The furthest point was removed.
    Retracted {
        /// Sweep-axis coordinate of the removed point.
        axis: f32,
    },
    /// A different surface was hit and the stroke was finished.
    Aborted(FinishedPick),
}

/// Interactive controller for one operator's picking.
#[derive(Debug)]
pub struct PickingSession {
    config: SessionConfig,
    picking_enabled: bool,
    strategy: SegmentStrategy,
    state: SessionState,
    surface: Option<Arc<RadargramSurface>>,
    points: BTreeMap<AxisKey, PickPoint>,
    pending_cleanup: Vec<VisualHandle>,
}

impl PickingSession {
    /// A new idle session with picking disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if `config` does not
    /// validate.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            strategy: config.strategy,
            config,
            picking_enabled: false,
            state: SessionState::Idle,
            surface: None,
            points: BTreeMap::new(),
            pending_cleanup: Vec::new(),
        })
    }

    /// The validated configuration the session was built with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Shorthand for `state() == SessionState::Active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Whether picking mode is on; strokes only start when it is.
    #[must_use]
    pub const fn is_picking_enabled(&self) -> bool {
        self.picking_enabled
    }

    /// Strategy used for the next segment.
    #[must_use]
    pub const fn strategy(&self) -> SegmentStrategy {
        self.strategy
    }

    /// The surface the current stroke is bound to.
    #[must_use]
    pub fn bound_surface(&self) -> Option<&Arc<RadargramSurface>> {
        self.surface.as_ref()
    }

    /// Committed points in sweep-axis order.
    pub fn points(&self) -> impl Iterator<Item = &PickPoint> {
        self.points.values()
    }

    /// Visuals waiting to be destroyed when the stroke finishes.
    #[must_use]
    pub fn pending_cleanup(&self) -> &[VisualHandle] {
        &self.pending_cleanup
    }

    /// Turn picking mode on or off.
    ///
    /// Turning it off during a stroke finishes the stroke.
    pub fn set_picking_enabled(
        &mut self,
        enabled: bool,
        host: &mut impl PickingHost,
    ) -> Option<FinishedPick> {
        self.picking_enabled = enabled;
        log::info!("picking {}", if enabled { "enabled" } else { "disabled" });
        if !enabled && self.is_active() {
            return Some(self.finish(host));
        }
        None
    }

    /// Flip picking mode; see [`set_picking_enabled`](Self::set_picking_enabled).
    pub fn toggle_picking(&mut self, host: &mut impl PickingHost) -> Option<FinishedPick> {
        self.set_picking_enabled(!self.picking_enabled, host)
    }

    /// Switch between guided and unguided segments.
    ///
    /// Only allowed while picking is enabled. Segments already drawn are
    /// kept. Returns whether the strategy changed.
    pub fn toggle_guided(&mut self) -> bool {
        if !self.picking_enabled {
            log::debug!("toggle_guided ignored: picking is disabled");
            return false;
        }
        self.strategy = self.strategy.toggled();
        log::info!("segment strategy is now {:?}", self.strategy);
        true
    }

    /// Start a stroke. Ignored unless picking is enabled and the session
    /// is idle. Returns whether a stroke started.
    pub fn press(&mut self) -> bool {
        if !self.picking_enabled || self.is_active() {
            return false;
        }
        self.points.clear();
        self.surface = None;
        self.state = SessionState::Active;
        log::debug!("stroke started");
        true
    }

    /// End the stroke.
    ///
    /// Returns the finished stroke the first time; `None` when idle.
    pub fn release(&mut self, host: &mut impl PickingHost) -> Option<FinishedPick> {
        self.is_active().then(|| self.finish(host))
    }

    /// Process one pointer sample.
    pub fn tick(&mut self, hit: Option<&PointerHit>, host: &mut impl PickingHost) -> TickOutcome {
        if !self.is_active() {
            return TickOutcome::Inactive;
        }
        let Some(hit) = hit else {
            return TickOutcome::NoHit;
        };

        let surface = match &self.surface {
            None => {
                log::info!("stroke bound to {} ({})", hit.surface.name(), hit.surface.id());
                self.surface = Some(Arc::clone(&hit.surface));
                Arc::clone(&hit.surface)
            }
            Some(bound) if bound.id() != hit.surface.id() => {
                log::info!(
                    "pointer moved from {} to {}; finishing stroke",
                    bound.id(),
                    hit.surface.id()
                );
                return TickOutcome::Aborted(self.finish(host));
            }
            Some(bound) => Arc::clone(bound),
        };

        if !surface.is_pickable() {
            return TickOutcome::NotPickable;
        }

        let Some(candidate) = self.candidate(&surface, hit) else {
            return TickOutcome::Unmapped;
        };
        let axis = self.config.sweep_axis.component(candidate.world);

        let Some(&last_key) = self.points.keys().next_back() else {
            self.commit(&surface, candidate, axis, host);
            return TickOutcome::Committed {
                axis,
                segment_points: None,
            };
        };

        let delta = axis - last_key.0;
        if delta >= self.config.commit_threshold {
            let segment_points = self.attach_segment(&surface, last_key, &candidate, host);
            self.commit(&surface, candidate, axis, host);
            TickOutcome::Committed {
                axis,
                segment_points,
            }
        } else if delta <= -self.config.commit_threshold {
            self.retract_last(host);
            TickOutcome::Retracted { axis: last_key.0 }
        } else {
            TickOutcome::Held
        }
    }

    /// Map a hit onto the surface as a candidate point.
    fn candidate(&self, surface: &RadargramSurface, hit: &PointerHit) -> Option<PickPoint> {
        let Some(mesh) = surface.mesh() else {
            log::warn!("{}: no mesh, hit ignored", surface.name());
            return None;
        };

        let Some(mut uv) = mapping::approximate_uv_from_hit(hit.point, mesh, surface.transform())
        else {
            log::debug!("{}: hit {} has no UV", surface.name(), hit.point);
            return None;
        };
        if self.config.snap_to_texels
            && let Some(texture) = surface.texture()
        {
            uv = texture.snap_uv(uv);
        }

        let Some(world) = mapping::uv_to_world(uv, mesh, surface.transform()) else {
            log::debug!("{}: UV {uv} maps off the mesh", surface.name());
            return None;
        };

        Some(PickPoint {
            world,
            uv,
            normal: hit.normal,
            surface: surface.id(),
            marker: None,
            outgoing: None,
        })
    }

    /// Generate the segment from the point at `from_key` to `candidate`
    /// and store it as that point's outgoing segment.
    ///
    /// The segment starts where the segment leading into `from_key`
    /// ended, so consecutive segments join without a visible kink.
    fn attach_segment(
        &mut self,
        surface: &RadargramSurface,
        from_key: AxisKey,
        candidate: &PickPoint,
        host: &mut impl PickingHost,
    ) -> Option<usize> {
        let stitched_start = self
            .points
            .range(..from_key)
            .next_back()
            .and_then(|(_, p)| p.outgoing.as_ref())
            .and_then(|segment| segment.points.last().copied());

        let from = self.points.get(&from_key)?;
        let (start_world, start_uv) = match stitched_start {
            Some(world) => {
                let uv = surface
                    .mesh()
                    .and_then(|mesh| mapping::world_to_uv(world, mesh, surface.transform()))
                    .unwrap_or(from.uv);
                (world, uv)
            }
            None => (from.world, from.uv),
        };

        let request = SegmentRequest {
            surface,
            start_world,
            start_uv,
            end_world: candidate.world,
            end_uv: candidate.uv,
            hit_normal: from.normal,
        };

        let segment = match self.strategy.generate(&request, &self.config) {
            Ok(segment) => segment,
            Err(e) => {
                log::warn!("{}: no segment to {}: {e}", surface.name(), candidate.world);
                return None;
            }
        };

        if self.config.export_debug_images
            && let Some(trace) = &segment.trace
        {
            host.export_debug_trace(surface, trace);
        }

        if segment.points.is_empty() {
            log::warn!("{}: segment to {} is empty", surface.name(), candidate.world);
            return None;
        }

        let len = segment.points.len();
        let handle = host.draw_segment(surface, &segment.points);
        let replaced = self.points.get_mut(&from_key).and_then(|from| {
            from.outgoing.replace(OutgoingSegment {
                points: segment.points,
                handle,
            })
        });
        if let Some(handle) = replaced.and_then(|old| old.handle) {
            self.discard(handle, host);
        }
        Some(len)
    }

    fn commit(
        &mut self,
        surface: &RadargramSurface,
        mut point: PickPoint,
        axis: f32,
        host: &mut impl PickingHost,
    ) {
        point.marker = host.spawn_marker(surface, point.world, self.config.show_debug_points);
        log::info!(
            "{}: committed point {} (uv {})",
            surface.name(),
            point.world,
            point.uv
        );
        self.points.insert(AxisKey(axis), point);
    }

    /// Remove the furthest point together with the segment that led to it.
    fn retract_last(&mut self, host: &mut impl PickingHost) {
        let Some((key, removed)) = self.points.pop_last() else {
            return;
        };
        log::info!("retracted point {}", removed.world);

        let mut handles: Vec<VisualHandle> = removed.marker.into_iter().collect();
        handles.extend(removed.outgoing.and_then(|segment| segment.handle));
        if let Some(mut previous) = self.points.last_entry() {
            handles.extend(previous.get_mut().outgoing.take().and_then(|s| s.handle));
        }
        log::debug!("queued {} visuals of point at {} for cleanup", handles.len(), key.0);

        for handle in handles {
            self.discard(handle, host);
        }
    }

    fn discard(&mut self, handle: VisualHandle, host: &mut impl PickingHost) {
        host.deactivate(handle);
        self.pending_cleanup.push(handle);
    }

    /// Tear the stroke down and hand back what was picked.
    fn finish(&mut self, host: &mut impl PickingHost) -> FinishedPick {
        self.state = SessionState::Idle;
        let surface = self.surface.take();
        let mut points: Vec<PickPoint> = std::mem::take(&mut self.points).into_values().collect();

        let segments: Vec<VisualHandle> = points
            .iter()
            .filter_map(|p| p.outgoing.as_ref().and_then(|s| s.handle))
            .collect();
        if let Some(surface) = &surface
            && !segments.is_empty()
        {
            host.group_segments(surface, &segments);
        }

        for point in &mut points {
            if let Some(marker) = point.marker.take() {
                host.destroy(marker);
            }
        }
        for handle in self.pending_cleanup.drain(..) {
            host.destroy(handle);
        }

        let polyline = stitch(&points);
        log::info!(
            "stroke finished: {} points, {} segments, {} polyline vertices",
            points.len(),
            segments.len(),
            polyline.len()
        );

        FinishedPick {
            surface: surface.map(|s| s.id()),
            points,
            polyline,
        }
    }
}

/// Join the outgoing segments of `points` into one path.
///
/// A point without an outgoing segment contributes its own position, so
/// a failed segment leaves a straight jump instead of a gap. The final
/// point is covered by the last segment when there is one.
fn stitch(points: &[PickPoint]) -> Vec<Vec3> {
    let mut polyline: Vec<Vec3> = Vec::new();
    let mut push = |p: Vec3| {
        if polyline
            .last()
            .is_none_or(|last| last.distance_squared(p) > STITCH_EPSILON * STITCH_EPSILON)
        {
            polyline.push(p);
        }
    };

    let last_index = points.len().saturating_sub(1);
    let mut previous_had_segment = false;
    for (i, point) in points.iter().enumerate() {
        match &point.outgoing {
            Some(segment) if !segment.points.is_empty() => {
                segment.points.iter().copied().for_each(&mut push);
                previous_had_segment = true;
            }
            _ => {
                if !(i == last_index && previous_had_segment) {
                    push(point.world);
                }
                previous_had_segment = false;
            }
        }
    }
    polyline
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::mesh::Mesh;
    use crate::surface::SurfaceOrientation;
    use crate::texture::Texture;

    const W: u32 = 200;
    const H: u32 = 40;
    /// Picture row (top-down) of the reflection; UV row index 20.
    const HORIZON_ROW: u32 = 19;
    const HORIZON_UV_ROW: u32 = H - 1 - HORIZON_ROW;

    #[derive(Debug, Default)]
    struct RecordingHost {
        next: u64,
        markers: Vec<(VisualHandle, bool)>,
        segments: Vec<(VisualHandle, Vec<Vec3>)>,
        deactivated: Vec<VisualHandle>,
        destroyed: Vec<VisualHandle>,
        groups: Vec<Vec<VisualHandle>>,
        exports: usize,
    }

    impl RecordingHost {
        fn handle(&mut self) -> VisualHandle {
            self.next += 1;
            VisualHandle(self.next)
        }
    }

    impl PickingHost for RecordingHost {
        fn draw_segment(&mut self, _: &RadargramSurface, points: &[Vec3]) -> Option<VisualHandle> {
            let handle = self.handle();
            self.segments.push((handle, points.to_vec()));
            Some(handle)
        }

        fn spawn_marker(&mut self, _: &RadargramSurface, _: Vec3, visible: bool) -> Option<VisualHandle> {
            let handle = self.handle();
            self.markers.push((handle, visible));
            Some(handle)
        }

        fn deactivate(&mut self, handle: VisualHandle) {
            self.deactivated.push(handle);
        }

        fn destroy(&mut self, handle: VisualHandle) {
            self.destroyed.push(handle);
        }

        fn group_segments(&mut self, _: &RadargramSurface, segments: &[VisualHandle]) {
            self.groups.push(segments.to_vec());
        }

        fn export_debug_trace(&mut self, _: &RadargramSurface, _: &HorizonTrace) {
            self.exports += 1;
        }
    }

    fn radargram() -> GrayImage {
        GrayImage::from_fn(W, H, |_, y| Luma([if y == HORIZON_ROW { 220 } else { 30 }]))
    }

    /// 10×2 plane along X carrying the radargram.
    fn surface(id: u64) -> Arc<RadargramSurface> {
        Arc::new(
            RadargramSurface::new(SurfaceId(id), format!("line-{id}"))
                .with_mesh(Arc::new(Mesh::plane_grid(20, 2, Vec2::new(10.0, 2.0))))
                .with_texture(Arc::new(Texture::from_image(&radargram())))
                .with_orientation(SurfaceOrientation::default()),
        )
    }

    /// Hit at the centre of UV texel `(i, j)`.
    fn hit(surface: &Arc<RadargramSurface>, i: u32, j: u32) -> PointerHit {
        PointerHit {
            point: Vec3::new(
                (i as f32 + 0.5) * 10.0 / W as f32,
                (j as f32 + 0.5) * 2.0 / H as f32,
                0.0,
            ),
            normal: Vec3::Z,
            surface: Arc::clone(surface),
        }
    }

    fn active_session(config: SessionConfig) -> (PickingSession, RecordingHost) {
        let mut session = PickingSession::new(config).unwrap();
        let mut host = RecordingHost::default();
        session.set_picking_enabled(true, &mut host);
        assert!(session.press());
        (session, host)
    }

    fn axes(session: &PickingSession) -> Vec<f32> {
        session.points.keys().map(|k| k.0).collect()
    }

    // --- lifecycle ---

    #[test]
    fn new_rejects_invalid_config() {
        let config = SessionConfig {
            guided_stride: 0,
            ..SessionConfig::default()
        };
        assert!(PickingSession::new(config).is_err());
    }

    #[test]
    fn press_requires_picking_enabled() {
        let mut session = PickingSession::new(SessionConfig::default()).unwrap();
        assert!(!session.press());
        assert_eq!(session.state(), SessionState::Idle);

        let mut host = RecordingHost::default();
        session.toggle_picking(&mut host);
        assert!(session.press());
        assert_eq!(session.state(), SessionState::Active);
        // A second press while active is ignored.
        assert!(!session.press());
    }

    #[test]
    fn tick_while_idle_is_inactive() {
        let mut session = PickingSession::new(SessionConfig::default()).unwrap();
        let s = surface(1);
        let outcome = session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut RecordingHost::default());
        assert_eq!(outcome, TickOutcome::Inactive);
    }

    #[test]
    fn first_hit_binds_and_commits() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        assert_eq!(session.tick(None, &mut host), TickOutcome::NoHit);
        assert!(session.bound_surface().is_none());

        let outcome = session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        assert!(matches!(outcome, TickOutcome::Committed { segment_points: None, .. }));
        assert_eq!(session.bound_surface().map(|b| b.id()), Some(SurfaceId(1)));
        assert_eq!(session.points().count(), 1);
        assert!(host.segments.is_empty());
        assert_eq!(host.markers.len(), 1);
        assert!(!host.markers[0].1, "markers are hidden by default");
    }

    #[test]
    fn candidate_is_snapped_to_texel_centre() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        let mut off_centre = hit(&s, 10, HORIZON_UV_ROW);
        off_centre.point.x += 0.02;
        session.tick(Some(&off_centre), &mut host);
        let point = session.points().next().unwrap();
        assert!((point.world.x - hit(&s, 10, HORIZON_UV_ROW).point.x).abs() < 1e-4);
    }

    // --- commit / retract ---

    #[test]
    fn commits_are_monotonic_and_spaced() {
        let config = SessionConfig {
            commit_threshold: 0.12,
            ..SessionConfig::default()
        };
        let (mut session, mut host) = active_session(config);
        let s = surface(1);
        for i in 0..40 {
            session.tick(Some(&hit(&s, i, HORIZON_UV_ROW)), &mut host);
        }

        let axes = axes(&session);
        assert_eq!(axes.len(), 14);
        for pair in axes.windows(2) {
            assert!(pair[1] - pair[0] >= 0.12, "gap {pair:?}");
        }
    }

    #[test]
    fn small_moves_are_held() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        let mut nudged = hit(&s, 10, HORIZON_UV_ROW);
        nudged.point.x += 0.01;
        assert_eq!(session.tick(Some(&nudged), &mut host), TickOutcome::Held);
        assert_eq!(session.points().count(), 1);
    }

    #[test]
    fn commit_then_retract_leaves_first_point_only() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        let only_a: Vec<PickPoint> = session.points().cloned().collect();

        let outcome = session.tick(Some(&hit(&s, 20, HORIZON_UV_ROW)), &mut host);
        assert!(matches!(outcome, TickOutcome::Committed { segment_points: Some(_), .. }));
        assert_eq!(host.segments.len(), 1);
        assert!(session.points().next().unwrap().outgoing.is_some());

        let outcome = session.tick(Some(&hit(&s, 15, HORIZON_UV_ROW)), &mut host);
        assert!(matches!(outcome, TickOutcome::Retracted { .. }));

        let remaining: Vec<PickPoint> = session.points().cloned().collect();
        assert_eq!(remaining, only_a);

        // B's marker and the A→B segment are queued, not leaked.
        let segment_handle = host.segments[0].0;
        let b_marker = host.markers[1].0;
        assert!(session.pending_cleanup().contains(&segment_handle));
        assert!(session.pending_cleanup().contains(&b_marker));
        assert!(host.deactivated.contains(&segment_handle));

        let finished = session.release(&mut host).unwrap();
        assert!(host.destroyed.contains(&segment_handle));
        assert!(host.destroyed.contains(&b_marker));
        assert!(host.groups.is_empty());
        assert_eq!(finished.points.len(), 1);
    }

    #[test]
    fn retract_then_recommit_draws_fresh_segment() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        for i in [10, 20, 15, 30] {
            session.tick(Some(&hit(&s, i, HORIZON_UV_ROW)), &mut host);
        }
        assert_eq!(session.points().count(), 2);
        let a = session.points().next().unwrap();
        let segment = a.outgoing.as_ref().unwrap();
        assert_eq!(segment.handle, Some(host.segments[1].0));
    }

    // --- segments ---

    #[test]
    fn segment_failure_still_commits_point() {
        let s = Arc::new(
            RadargramSurface::new(SurfaceId(4), "no-orientation")
                .with_mesh(Arc::new(Mesh::plane_grid(20, 2, Vec2::new(10.0, 2.0))))
                .with_texture(Arc::new(Texture::from_image(&radargram()))),
        );
        let (mut session, mut host) = active_session(SessionConfig::default());
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        let outcome = session.tick(Some(&hit(&s, 30, HORIZON_UV_ROW)), &mut host);
        assert!(matches!(outcome, TickOutcome::Committed { segment_points: None, .. }));
        assert_eq!(session.points().count(), 2);
        assert!(host.segments.is_empty());
    }

    #[test]
    fn segments_are_stitched_to_previous_end() {
        let config = SessionConfig {
            guided_stride: 1,
            ..SessionConfig::default()
        };
        let (mut session, mut host) = active_session(config);
        let s = surface(1);
        // A on the reflection, B two rows off it, C back on it.
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        session.tick(Some(&hit(&s, 20, HORIZON_UV_ROW - 2)), &mut host);
        session.tick(Some(&hit(&s, 30, HORIZON_UV_ROW)), &mut host);

        assert_eq!(host.segments.len(), 2);
        let first = &host.segments[0].1;
        let second = &host.segments[1].1;
        let b = session.points().nth(1).unwrap().world;

        let joint = *first.last().unwrap();
        assert!(second[0].distance(joint) < 1e-4, "second starts at {}", second[0]);
        assert!(second[0].distance(b) > 0.05, "second should not start at B");
        // Both segments run left to right along the reflection.
        assert!(first[0].x < joint.x && joint.x < second.last().unwrap().x);
    }

    #[test]
    fn unguided_mode_draws_straight_segments() {
        let config = SessionConfig {
            strategy: SegmentStrategy::Unguided,
            unguided_interval: 0.1,
            ..SessionConfig::default()
        };
        let (mut session, mut host) = active_session(config);
        let s = surface(1);
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        let outcome = session.tick(Some(&hit(&s, 30, HORIZON_UV_ROW - 4)), &mut host);
        assert!(
            matches!(outcome, TickOutcome::Committed { segment_points: Some(n), .. } if n >= 10),
            "expected a committed segment, got {outcome:?}"
        );
    }

    #[test]
    fn debug_traces_are_exported_when_enabled() {
        let config = SessionConfig {
            export_debug_images: true,
            show_debug_points: true,
            ..SessionConfig::default()
        };
        let (mut session, mut host) = active_session(config);
        let s = surface(1);
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        session.tick(Some(&hit(&s, 30, HORIZON_UV_ROW)), &mut host);
        assert_eq!(host.exports, 1);
        assert!(host.markers.iter().all(|(_, visible)| *visible));
    }

    // --- mode toggles ---

    #[test]
    fn toggle_guided_only_while_picking() {
        let mut session = PickingSession::new(SessionConfig::default()).unwrap();
        let mut host = RecordingHost::default();
        assert!(!session.toggle_guided());
        assert_eq!(session.strategy(), SegmentStrategy::Guided);

        session.set_picking_enabled(true, &mut host);
        assert!(session.toggle_guided());
        assert_eq!(session.strategy(), SegmentStrategy::Unguided);
    }

    #[test]
    fn disabling_picking_finishes_stroke() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        let finished = session.set_picking_enabled(false, &mut host).unwrap();
        assert_eq!(finished.points.len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    // --- surfaces ---

    #[test]
    fn hit_on_other_surface_aborts_once() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s1 = surface(1);
        let s2 = surface(2);
        session.tick(Some(&hit(&s1, 10, HORIZON_UV_ROW)), &mut host);
        session.tick(Some(&hit(&s1, 30, HORIZON_UV_ROW)), &mut host);

        let outcome = session.tick(Some(&hit(&s2, 40, HORIZON_UV_ROW)), &mut host);
        assert!(matches!(outcome, TickOutcome::Aborted(_)), "expected abort, got {outcome:?}");
        let TickOutcome::Aborted(finished) = outcome else {
            return;
        };
        assert_eq!(finished.surface, Some(SurfaceId(1)));
        assert_eq!(finished.points.len(), 2);
        assert_eq!(host.groups.len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.bound_surface().is_none());

        // Release after an abort does nothing.
        assert!(session.release(&mut host).is_none());
        assert_eq!(host.groups.len(), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let s = surface(1);
        session.tick(Some(&hit(&s, 10, HORIZON_UV_ROW)), &mut host);
        assert!(session.release(&mut host).is_some());
        let destroyed = host.destroyed.len();
        assert!(session.release(&mut host).is_none());
        assert_eq!(host.destroyed.len(), destroyed);
    }

    #[test]
    fn release_without_hits_yields_empty_pick() {
        let (mut session, mut host) = active_session(SessionConfig::default());
        let finished = session.release(&mut host).unwrap();
        assert_eq!(finished.surface, None);
        assert!(finished.points.is_empty());
        assert!(finished.polyline.is_empty());
    }

    #[test]
    fn unpickable_surface_is_skipped() {
        let s = Arc::new(RadargramSurface::new(SurfaceId(9), "locked").with_pickable(false));
        let (mut session, mut host) = active_session(SessionConfig::default());
        assert_eq!(session.tick(Some(&hit(&s, 10, 10)), &mut host), TickOutcome::NotPickable);
        assert_eq!(session.points().count(), 0);
    }

    #[test]
    fn surface_without_mesh_is_unmapped() {
        let s = Arc::new(RadargramSurface::new(SurfaceId(9), "empty"));
        let (mut session, mut host) = active_session(SessionConfig::default());
        assert_eq!(session.tick(Some(&hit(&s, 10, 10)), &mut host), TickOutcome::Unmapped);
    }

    // --- finish ---

    #[test]
    fn finish_groups_segments_and_stitches_polyline() {
        let (mut session, mut host) = active_session(SessionConfig {
            guided_stride: 2,
            ..SessionConfig::default()
        });
        let s = surface(1);
        for i in [10, 20, 30] {
            session.tick(Some(&hit(&s, i, HORIZON_UV_ROW)), &mut host);
        }
        let finished = session.release(&mut host).unwrap();

        assert_eq!(host.groups, vec![vec![host.segments[0].0, host.segments[1].0]]);
        assert!(finished.points.iter().all(|p| p.marker.is_none()));
        for (handle, _) in &host.markers {
            assert!(host.destroyed.contains(handle));
        }

        // 6 + 6 samples sharing the junction.
        assert_eq!(finished.polyline.len(), 11);
        assert!(finished.polyline.windows(2).all(|w| w[0].x < w[1].x));
        assert!(finished.polyline[0].distance(finished.points[0].world) < 1e-4);
    }

    #[test]
    fn stitch_bridges_missing_segments() {
        let point = |x: f32, outgoing: Option<Vec<Vec3>>| PickPoint {
            world: Vec3::new(x, 0.0, 0.0),
            uv: Vec2::ZERO,
            normal: Vec3::Z,
            surface: SurfaceId(1),
            marker: None,
            outgoing: outgoing.map(|points| OutgoingSegment { points, handle: None }),
        };
        let points = vec![
            point(0.0, Some(vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.1, 0.0)])),
            point(1.0, None),
            point(2.0, Some(vec![Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)])),
            point(3.0, None),
        ];
        let polyline = stitch(&points);
        assert_eq!(
            polyline,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.1, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(3.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn axis_key_orders_by_total_cmp() {
        let mut keys = [AxisKey(2.0), AxisKey(-1.0), AxisKey(0.5)];
        keys.sort();
        assert_eq!(keys.map(|k| k.0), [-1.0, 0.5, 2.0]);
        assert_eq!(AxisKey(1.0), AxisKey(1.0));
    }
}
