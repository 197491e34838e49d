//! The cooperative sampling loop that drives a picking stroke.
//!
//! One iteration samples the pointer, feeds the hit to
//! [`PickingSession::tick`], then sleeps for the configured interval.
//! The [`CancelToken`] is checked at the top of every iteration, so a
//! trigger release is honoured within one tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::session::{FinishedPick, PickingHost, PickingSession, TickOutcome};
use crate::surface::PointerHit;

/// Where pointer hits come from (a controller ray, a mouse, a script).
pub trait PointerSource {
    /// The current hit, or `None` when the pointer is not on a surface.
    fn sample(&mut self) -> Option<PointerHit>;
}

/// Pauses between ticks.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared flag telling the sampling loop to finish the stroke.
///
/// Clones share the flag, so one clone can live with the trigger handler
/// while another is passed to [`run_sampling_loop`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Run one stroke: press, tick until cancelled or aborted, finish.
///
/// Returns `None` without sampling if the stroke could not start (picking
/// disabled, or a stroke is already active) or if the session was made
/// idle from elsewhere mid-stroke.
pub fn run_sampling_loop(
    session: &mut PickingSession,
    pointer: &mut impl PointerSource,
    host: &mut impl PickingHost,
    sleeper: &mut impl Sleeper,
    cancel: &CancelToken,
) -> Option<FinishedPick> {
    if !session.press() {
        log::debug!("sampling loop not started: session cannot start a stroke");
        return None;
    }
    let interval = Duration::from_millis(session.config().tick_interval_ms);

    loop {
        if cancel.is_cancelled() {
            return session.release(host);
        }

        let hit = pointer.sample();
        match session.tick(hit.as_ref(), host) {
            TickOutcome::Aborted(finished) => return Some(finished),
            TickOutcome::Inactive => return None,
            outcome => log::trace!("tick: {outcome:?}"),
        }

        sleeper.sleep(interval);
    }
}
