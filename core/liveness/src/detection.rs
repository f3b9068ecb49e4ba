use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::LivenessError;
use crate::frame::Frame;
use crate::region::FaceRegion;
use crate::result::DetectionResult;
use crate::session::EngineSession;

/// Monotonic time source used to measure detection latency.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin. Must never go backwards.
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Score one face region in a YUV 4:2:0 frame.
///
/// Without a region, or with an inverted one, nothing is sent to the engine
/// and an empty result is returned. A frame whose length does not match
/// `width` × `height` fails before the engine is called.
#[allow(clippy::too_many_arguments)]
pub(crate) fn detect(
    session: &mut EngineSession,
    clock: &dyn Clock,
    yuv: &[u8],
    width: u32,
    height: u32,
    orientation: i32,
    region: Option<FaceRegion>,
    threshold: f32,
) -> Result<DetectionResult, LivenessError> {
    let Some(region) = region else {
        return Ok(DetectionResult::empty(threshold));
    };
    if !region.is_well_formed() {
        warn!(?region, "skipping liveness check on inverted face region");
        return Ok(DetectionResult::empty(threshold));
    }

    let begin = clock.now();
    let frame = Frame::new(yuv, width, height, orientation)?;
    let score = session.invoke(&frame, &region)?;
    let end = clock.now();

    let elapsed_ms = end.saturating_sub(begin).as_millis() as u64;
    debug!(score, elapsed_ms, "liveness check finished");

    Ok(DetectionResult::assemble(region, score, elapsed_ms, threshold))
}
