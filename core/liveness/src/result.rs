use crate::region::FaceRegion;

/// Outcome of one liveness detection call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    /// The scored face region, with `confidence` set. `None` when no
    /// detection was performed.
    pub region: Option<FaceRegion>,

    /// Wall time spent validating the frame and running inference, in
    /// whole milliseconds.
    pub elapsed_ms: u64,

    /// Whether the engine produced a score for the region.
    pub succeeded: bool,

    /// Confidence above which the face counts as live.
    pub threshold: f32,
}

impl DetectionResult {
    /// Result for a call that never reached the engine.
    pub fn empty(threshold: f32) -> Self {
        Self {
            region: None,
            elapsed_ms: 0,
            succeeded: false,
            threshold,
        }
    }

    /// Package a scored region. The score is written into the region's
    /// confidence.
    pub fn assemble(mut region: FaceRegion, score: f32, elapsed_ms: u64, threshold: f32) -> Self {
        region.confidence = score;
        Self {
            region: Some(region),
            elapsed_ms,
            succeeded: true,
            threshold,
        }
    }

    /// Liveness confidence of the region, or `0.0` without a detection.
    pub fn confidence(&self) -> f32 {
        self.region.map_or(0.0, |region| region.confidence)
    }

    /// `true` when a detection succeeded and its confidence exceeds the
    /// threshold.
    pub fn is_live(&self) -> bool {
        self.succeeded && self.confidence() > self.threshold
    }
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::empty(crate::DEFAULT_THRESHOLD)
    }
}
