/// Face rectangle in frame pixel coordinates, as produced by an external
/// face detector, plus the liveness confidence written by detection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceRegion {
    /// Left edge (pixels).
    pub left: i32,
    /// Top edge (pixels).
    pub top: i32,
    /// Right edge (pixels).
    pub right: i32,
    /// Bottom edge (pixels).
    pub bottom: i32,
    /// Liveness confidence; zero until a detection succeeds.
    pub confidence: f32,
}

impl FaceRegion {
    /// Region with the given edges and zero confidence.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            confidence: 0.0,
        }
    }

    /// Build a region from floating-point detector output, truncating each
    /// edge toward zero.
    pub fn from_rect_f32(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left as i32, top as i32, right as i32, bottom as i32)
    }

    /// Flip the region horizontally inside a frame `frame_width` pixels wide.
    ///
    /// Converts boxes from detectors that measure x from the right edge
    /// (mirrored front-camera previews) to the left-origin coordinates the
    /// engine expects.
    pub fn mirrored(&self, frame_width: i32) -> Self {
        Self {
            left: frame_width.saturating_sub(self.right),
            right: frame_width.saturating_sub(self.left),
            ..*self
        }
    }

    /// `true` when `left <= right` and `top <= bottom`.
    pub fn is_well_formed(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    /// Horizontal extent; negative for an inverted region.
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    /// Vertical extent; negative for an inverted region.
    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }
}
