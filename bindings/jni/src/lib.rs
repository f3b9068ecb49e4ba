uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LivenessError {
    #[error("failed to read model config: {message}")]
    ConfigRead { message: String },
    #[error("model config document has no entries")]
    EmptyConfig,
    #[error("invalid model config: {message}")]
    InvalidModelConfig { message: String },
    #[error("{message}")]
    SizeMismatch {
        expected: u64,
        actual: u64,
        message: String,
    },
    #[error("native engine failed to load models (status {status})")]
    NativeLoad { status: i32 },
    #[error("native engine returned a null handle")]
    AllocationFailed,
    #[error("{message}")]
    Lifecycle { message: String },
    #[error("invalid threshold value")]
    InvalidThreshold,
}

impl From<liveness::LivenessError> for LivenessError {
    fn from(e: liveness::LivenessError) -> Self {
        let message = e.to_string();
        match e {
            liveness::LivenessError::ConfigRead(msg) => LivenessError::ConfigRead { message: msg },
            liveness::LivenessError::EmptyConfig => LivenessError::EmptyConfig,
            liveness::LivenessError::InvalidModelConfig { .. } => {
                LivenessError::InvalidModelConfig { message }
            }
            liveness::LivenessError::SizeMismatch {
                expected, actual, ..
            } => LivenessError::SizeMismatch {
                expected: expected as u64,
                actual: actual as u64,
                message,
            },
            liveness::LivenessError::NativeLoad(status) => LivenessError::NativeLoad { status },
            liveness::LivenessError::AllocationFailed => LivenessError::AllocationFailed,
            liveness::LivenessError::Lifecycle { .. } => LivenessError::Lifecycle { message },
            liveness::LivenessError::InvalidThreshold(_) => LivenessError::InvalidThreshold,
        }
    }
}

#[derive(uniffi::Record)]
pub struct ModelConfig {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub scale: f32,
    pub shift_x: f32,
    pub shift_y: f32,
    pub org_resize: bool,
}

impl From<&liveness::ModelConfig> for ModelConfig {
    fn from(config: &liveness::ModelConfig) -> Self {
        ModelConfig {
            name: config.name.clone(),
            width: config.width,
            height: config.height,
            scale: config.scale,
            shift_x: config.shift_x,
            shift_y: config.shift_y,
            org_resize: config.org_resize,
        }
    }
}

#[derive(uniffi::Record)]
pub struct FaceBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub confidence: f32,
}

impl From<FaceBox> for liveness::FaceRegion {
    fn from(face: FaceBox) -> Self {
        liveness::FaceRegion {
            left: face.left,
            top: face.top,
            right: face.right,
            bottom: face.bottom,
            confidence: face.confidence,
        }
    }
}

impl From<liveness::FaceRegion> for FaceBox {
    fn from(region: liveness::FaceRegion) -> Self {
        FaceBox {
            left: region.left,
            top: region.top,
            right: region.right,
            bottom: region.bottom,
            confidence: region.confidence,
        }
    }
}

#[derive(uniffi::Record)]
pub struct DetectionResult {
    pub face_box: Option<FaceBox>,
    pub confidence: f32,
    pub threshold: f32,
    pub time_ms: u64,
    pub has_face: bool,
    pub is_live: bool,
}

impl From<liveness::DetectionResult> for DetectionResult {
    fn from(result: liveness::DetectionResult) -> Self {
        DetectionResult {
            face_box: result.region.map(FaceBox::from),
            confidence: result.confidence(),
            threshold: result.threshold,
            time_ms: result.elapsed_ms,
            has_face: result.succeeded,
            is_live: result.is_live(),
        }
    }
}

/// Native liveness engine implemented on the Kotlin side (typically a thin
/// JNI wrapper over the C++ engine).
#[uniffi::export(with_foreign)]
pub trait ForeignEngine: Send + Sync {
    /// Create an engine instance; `0` signals failure.
    fn allocate(&self) -> u64;
    fn deallocate(&self, handle: u64);
    /// Load the ensemble from `model_dir`; `0` signals success.
    fn load_model(&self, handle: u64, model_dir: String, configs: Vec<ModelConfig>) -> i32;
    fn detect_yuv(
        &self,
        handle: u64,
        yuv: Vec<u8>,
        width: u32,
        height: u32,
        orientation: i32,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> f32;
}

struct ForeignAdapter(Arc<dyn ForeignEngine>);

impl liveness::NativeEngine for ForeignAdapter {
    fn allocate(&mut self) -> liveness::RawHandle {
        self.0.allocate()
    }

    fn deallocate(&mut self, handle: liveness::RawHandle) {
        self.0.deallocate(handle)
    }

    fn load_model(
        &mut self,
        handle: liveness::RawHandle,
        model_dir: &Path,
        configs: &[liveness::ModelConfig],
    ) -> i32 {
        self.0.load_model(
            handle,
            model_dir.to_string_lossy().into_owned(),
            configs.iter().map(ModelConfig::from).collect(),
        )
    }

    fn detect_yuv(
        &mut self,
        handle: liveness::RawHandle,
        yuv: &[u8],
        width: u32,
        height: u32,
        orientation: i32,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> f32 {
        self.0.detect_yuv(
            handle,
            yuv.to_vec(),
            width,
            height,
            orientation,
            left,
            top,
            right,
            bottom,
        )
    }
}

#[derive(uniffi::Object)]
pub struct LivenessEngine {
    inner: liveness::LivenessEngine,
}

#[uniffi::export]
impl LivenessEngine {
    /// Create the native engine instance. `model_dir` holds the model files
    /// and `config.json`.
    #[uniffi::constructor]
    pub fn new(
        engine: Arc<dyn ForeignEngine>,
        model_dir: String,
        threshold: f32,
    ) -> Result<Arc<Self>, LivenessError> {
        let inner = liveness::LivenessEngine::builder(Box::new(ForeignAdapter(engine)))
            .model_dir(model_dir)
            .threshold(threshold)
            .build()?;
        Ok(Arc::new(Self { inner }))
    }

    /// Load the model ensemble; `true` when ready for detection.
    pub fn init(&self) -> bool {
        self.inner.init()
    }

    pub fn destroy(&self) {
        self.inner.destroy()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    /// Score `face_box` in a YUV420SP frame. A missing box yields a result
    /// with `has_face == false`.
    pub fn detect(
        &self,
        yuv: Vec<u8>,
        width: u32,
        height: u32,
        orientation: i32,
        face_box: Option<FaceBox>,
    ) -> Result<DetectionResult, LivenessError> {
        let result = self
            .inner
            .detect(&yuv, width, height, orientation, face_box.map(Into::into))?;
        Ok(result.into())
    }

    pub fn configs(&self) -> Vec<ModelConfig> {
        self.inner.configs().iter().map(ModelConfig::from).collect()
    }
}

/// Number of bytes a YUV420SP frame of `width` × `height` must hold.
#[uniffi::export]
pub fn expected_frame_len(width: u32, height: u32) -> u64 {
    liveness::expected_frame_len(width, height).map_or(u64::MAX, |len| len as u64)
}
