use std::path::Path;

use crate::config::ModelConfig;

/// Raw handle issued by a [`NativeEngine`]. Zero is the null handle.
pub type RawHandle = u64;

/// Call surface of the native liveness engine.
///
/// Implement this trait over the inference backend (the C++ engine behind
/// JNI, an ONNX runtime, a test stub) and pass it to
/// [`crate::LivenessEngine::builder`]. The engine session owns the
/// implementation and guarantees the call order: `allocate` once, then
/// `load_model`, then any number of `detect_yuv`, then `deallocate` once.
pub trait NativeEngine: Send {
    /// Create an engine instance and return its handle, or `0` on failure.
    fn allocate(&mut self) -> RawHandle;

    /// Release the instance behind `handle`.
    fn deallocate(&mut self, handle: RawHandle);

    /// Load the model ensemble from `model_dir`. Returns `0` on success.
    fn load_model(&mut self, handle: RawHandle, model_dir: &Path, configs: &[ModelConfig]) -> i32;

    /// Score one face box inside a YUV 4:2:0 frame. Multi-model fusion is
    /// up to the engine; the returned value is the aggregated confidence.
    #[allow(clippy::too_many_arguments)]
    fn detect_yuv(
        &mut self,
        handle: RawHandle,
        yuv: &[u8],
        width: u32,
        height: u32,
        orientation: i32,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> f32;
}
