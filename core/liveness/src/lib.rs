//! On-device face liveness: drive a native anti-spoofing engine over camera
//! frames and face boxes supplied by the caller.
//!
//! The crate owns everything around the engine: reading the model ensemble
//! configuration, the engine's create/load/destroy lifecycle, checking frame
//! buffers before they cross the native boundary, and timing each call. The
//! scoring itself, including fusion of the ensemble, belongs to the
//! [`NativeEngine`] implementation.
//!
//! # Example
//!
//! ```no_run
//! use liveness::{FaceRegion, LivenessEngine, NativeEngine};
//! # fn engine() -> Box<dyn NativeEngine> { unimplemented!() }
//!
//! let live = LivenessEngine::builder(engine())
//!     .model_dir("assets/live")
//!     .threshold(0.9)
//!     .build()
//!     .unwrap();
//! assert!(live.init());
//!
//! let yuv = vec![0u8; 640 * 480 * 3 / 2];
//! let result = live
//!     .detect(&yuv, 640, 480, 7, Some(FaceRegion::new(118, 188, 306, 646)))
//!     .unwrap();
//! println!("confidence {:.4} in {}ms", result.confidence(), result.elapsed_ms);
//!
//! live.destroy();
//! ```
#![warn(missing_docs)]

/// Model ensemble configuration parsing.
pub mod config;
mod detection;
mod error;
/// Frame buffer validation and preparation.
pub mod frame;
/// Native engine call surface.
pub mod native;
mod region;
mod result;
mod session;

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

/// Preprocessing parameters of one ensemble model and the document parsers.
pub use config::{parse_configs, read_configs, ModelConfig};
/// Time sources for detection latency.
pub use detection::{Clock, MonotonicClock};
/// Error type returned by liveness operations.
pub use error::LivenessError;
/// Frame validation helpers.
pub use frame::{expected_frame_len, rgb_to_yuv420sp, validate_frame, Frame};
/// Native engine trait and handle type.
pub use native::{NativeEngine, RawHandle};
/// Face rectangle supplied by the caller.
pub use region::FaceRegion;
/// Outcome of a detection call.
pub use result::DetectionResult;
/// Engine lifecycle state machine.
pub use session::{EngineSession, EngineState};

/// Default directory holding the model files and `config.json`.
pub const DEFAULT_MODEL_DIR: &str = "live";

/// File name of the ensemble configuration inside the model directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default confidence above which a face counts as live.
pub const DEFAULT_THRESHOLD: f32 = 0.915;

/// Builder for [`LivenessEngine`].
pub struct LivenessEngineBuilder {
    engine: Box<dyn NativeEngine>,
    model_dir: PathBuf,
    config_path: Option<PathBuf>,
    threshold: f32,
    clock: Box<dyn Clock>,
}

impl LivenessEngineBuilder {
    /// Directory passed to the native engine to resolve model files
    /// (default: `live`). The configuration is read from
    /// `<model_dir>/config.json` unless [`Self::config_path`] is set.
    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Read the ensemble configuration from `path` instead of the model
    /// directory.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Confidence above which a face counts as live, from 0.0 to 1.0
    /// (default: 0.915).
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Time source for detection latency (default: [`MonotonicClock`]).
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Validate the settings and create the native engine instance.
    pub fn build(self) -> Result<LivenessEngine, LivenessError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(LivenessError::InvalidThreshold(self.threshold));
        }

        let config_path = self
            .config_path
            .unwrap_or_else(|| self.model_dir.join(CONFIG_FILE_NAME));

        let mut session = EngineSession::new(self.engine);
        session.create()?;

        Ok(LivenessEngine {
            session: Mutex::new(session),
            model_dir: self.model_dir,
            config_path,
            threshold: self.threshold,
            clock: self.clock,
        })
    }
}

/// Liveness detector for a single native engine instance.
///
/// Call [`init`](Self::init) once, then [`detect`](Self::detect) per frame,
/// then [`destroy`](Self::destroy). All engine calls are serialised through
/// an internal lock, so sharing the detector across threads is safe but
/// concurrent calls wait for each other.
pub struct LivenessEngine {
    session: Mutex<EngineSession>,
    model_dir: PathBuf,
    config_path: PathBuf,
    threshold: f32,
    clock: Box<dyn Clock>,
}

impl LivenessEngine {
    /// Start configuring a detector around `engine`.
    pub fn builder(engine: Box<dyn NativeEngine>) -> LivenessEngineBuilder {
        LivenessEngineBuilder {
            engine,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            config_path: None,
            threshold: DEFAULT_THRESHOLD,
            clock: Box::new(MonotonicClock::new()),
        }
    }

    /// Load the model ensemble. Returns `true` if the engine is ready for
    /// detection; see [`try_init`](Self::try_init) for the failure reason.
    pub fn init(&self) -> bool {
        match self.try_init() {
            Ok(()) => true,
            Err(e) => {
                warn!("liveness engine init failed: {e}");
                false
            }
        }
    }

    /// Load the model ensemble, reporting why it failed.
    pub fn try_init(&self) -> Result<(), LivenessError> {
        let document = config::read_document(&self.config_path)?;
        let configs = parse_configs(&document);

        self.session.lock().load(&self.model_dir, configs)?;
        info!(threshold = self.threshold, "liveness engine ready");
        Ok(())
    }

    /// Release the native engine. Safe to call whether or not
    /// [`init`](Self::init) succeeded; later calls do nothing.
    pub fn destroy(&self) {
        self.session.lock().destroy();
    }

    /// Score `region` in a YUV 4:2:0 frame of `width` × `height` pixels.
    ///
    /// Returns an empty, unsuccessful result without calling the engine when
    /// `region` is `None` or inverted. Fails with
    /// [`LivenessError::SizeMismatch`] when `yuv` does not hold exactly one
    /// frame, and with [`LivenessError::Lifecycle`] before a successful
    /// `init` or after `destroy`.
    pub fn detect(
        &self,
        yuv: &[u8],
        width: u32,
        height: u32,
        orientation: i32,
        region: Option<FaceRegion>,
    ) -> Result<DetectionResult, LivenessError> {
        let mut session = self.session.lock();
        detection::detect(
            &mut session,
            self.clock.as_ref(),
            yuv,
            width,
            height,
            orientation,
            region,
            self.threshold,
        )
    }

    /// `true` once the model ensemble is loaded and until `destroy`.
    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Loaded
    }

    /// Current lifecycle state of the underlying engine.
    pub fn state(&self) -> EngineState {
        self.session.lock().state()
    }

    /// Models of the loaded ensemble, in ensemble order.
    pub fn configs(&self) -> Vec<ModelConfig> {
        self.session.lock().configs().to_vec()
    }

    /// Confidence above which a face counts as live.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Directory the native engine resolves model files from.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    const CONFIG: &str = r#"[{"name":"m1","width":96,"height":96,"scale":1.0,"shift_x":0,"shift_y":0,"org_resize":false}]"#;

    #[derive(Default)]
    struct Calls {
        load: AtomicUsize,
        detect: AtomicUsize,
        deallocate: AtomicUsize,
    }

    /// Engine that scores every region 0.97 and counts calls.
    struct StubEngine(Arc<Calls>);

    impl NativeEngine for StubEngine {
        fn allocate(&mut self) -> RawHandle {
            1
        }

        fn deallocate(&mut self, _: RawHandle) {
            self.0.deallocate.fetch_add(1, Ordering::SeqCst);
        }

        fn load_model(&mut self, _: RawHandle, _: &Path, _: &[ModelConfig]) -> i32 {
            self.0.load.fetch_add(1, Ordering::SeqCst);
            0
        }

        fn detect_yuv(
            &mut self,
            _: RawHandle,
            _: &[u8],
            _: u32,
            _: u32,
            _: i32,
            _: i32,
            _: i32,
            _: i32,
            _: i32,
        ) -> f32 {
            self.0.detect.fetch_add(1, Ordering::SeqCst);
            0.97
        }
    }

    /// Clock that advances by a fixed step on every reading.
    struct SteppingClock {
        now_ms: Arc<AtomicU64>,
        step_ms: u64,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> Duration {
            Duration::from_millis(self.now_ms.fetch_add(self.step_ms, Ordering::SeqCst))
        }
    }

    fn config_dir(document: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), document).unwrap();
        dir
    }

    fn engine(document: &str) -> (LivenessEngine, Arc<Calls>, TempDir) {
        let calls = Arc::new(Calls::default());
        let dir = config_dir(document);
        let engine = LivenessEngine::builder(Box::new(StubEngine(calls.clone())))
            .model_dir(dir.path())
            .build()
            .unwrap();
        (engine, calls, dir)
    }

    #[test]
    fn builder_defaults() {
        let engine = LivenessEngine::builder(Box::new(StubEngine(Arc::default()))).build().unwrap();
        assert_eq!(engine.threshold(), DEFAULT_THRESHOLD);
        assert_eq!(engine.model_dir(), Path::new(DEFAULT_MODEL_DIR));
        assert_eq!(engine.state(), EngineState::Created);
        assert!(!engine.is_ready());
    }

    #[test]
    fn builder_invalid_threshold() {
        for threshold in [-0.1, 1.5, f32::NAN] {
            let result = LivenessEngine::builder(Box::new(StubEngine(Arc::default())))
                .threshold(threshold)
                .build();
            assert!(matches!(result, Err(LivenessError::InvalidThreshold(_))));
        }
    }

    #[test]
    fn init_and_detect() {
        let (engine, calls, _dir) = engine(CONFIG);
        assert!(engine.init());
        assert!(engine.is_ready());
        assert_eq!(engine.configs()[0].width, 96);

        let yuv = vec![0u8; 460_800];
        let result = engine
            .detect(&yuv, 640, 480, 7, Some(FaceRegion::new(10, 10, 50, 50)))
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.confidence(), 0.97);
        assert!(result.is_live());
        assert_eq!(calls.detect.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn init_fails_on_empty_document() {
        let (engine, calls, _dir) = engine("[]");
        assert!(!engine.init());
        assert!(matches!(engine.try_init(), Err(LivenessError::EmptyConfig)));
        assert_eq!(engine.state(), EngineState::Created);
        assert_eq!(calls.load.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn init_fails_on_missing_document() {
        let engine = LivenessEngine::builder(Box::new(StubEngine(Arc::default())))
            .config_path("/nonexistent/config.json")
            .build()
            .unwrap();
        assert!(!engine.init());
        let err = engine.try_init().unwrap_err();
        assert!(matches!(err, LivenessError::ConfigRead(_)));
        assert_eq!(err.status_code(), Some(-1));
    }

    #[test]
    fn elapsed_follows_clock() {
        let dir = config_dir(CONFIG);
        let engine = LivenessEngine::builder(Box::new(StubEngine(Arc::default())))
            .model_dir(dir.path())
            .clock(SteppingClock {
                now_ms: Arc::new(AtomicU64::new(1_000)),
                step_ms: 25,
            })
            .build()
            .unwrap();
        assert!(engine.init());

        let yuv = vec![0u8; 24];
        let result = engine
            .detect(&yuv, 4, 4, 0, Some(FaceRegion::new(0, 0, 2, 2)))
            .unwrap();
        assert_eq!(result.elapsed_ms, 25);
    }

    #[test]
    fn absent_or_inverted_region_skips_engine() {
        let (engine, calls, _dir) = engine(CONFIG);
        assert!(engine.init());
        let yuv = vec![0u8; 24];

        let result = engine.detect(&yuv, 4, 4, 0, None).unwrap();
        assert!(!result.succeeded);
        assert!(result.region.is_none());
        assert_eq!(result.threshold, DEFAULT_THRESHOLD);

        let result = engine
            .detect(&yuv, 4, 4, 0, Some(FaceRegion::new(3, 0, 1, 2)))
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(calls.detect.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detect_before_init_is_lifecycle_error() {
        let (engine, calls, _dir) = engine(CONFIG);
        let yuv = vec![0u8; 24];
        let result = engine.detect(&yuv, 4, 4, 0, Some(FaceRegion::new(0, 0, 2, 2)));
        assert!(matches!(
            result,
            Err(LivenessError::Lifecycle {
                state: EngineState::Created,
                ..
            })
        ));
        assert_eq!(calls.detect.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_reinit_stops_detection() {
        let (engine, calls, dir) = engine(CONFIG);
        assert!(engine.init());
        let yuv = vec![0u8; 24];
        let region = Some(FaceRegion::new(0, 0, 2, 2));

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[]").unwrap();
        assert!(!engine.init());
        assert!(!engine.is_ready());
        assert!(engine.configs().is_empty());
        assert!(matches!(
            engine.detect(&yuv, 4, 4, 0, region),
            Err(LivenessError::Lifecycle { .. })
        ));

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), CONFIG).unwrap();
        assert!(engine.init());
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"[{"name":"m"}]"#).unwrap();
        assert!(!engine.init());
        assert_eq!(engine.state(), EngineState::Created);
        assert_eq!(calls.detect.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn destroy_is_idempotent() {
        let (engine, calls, _dir) = engine(CONFIG);
        assert!(engine.init());
        engine.destroy();
        engine.destroy();
        drop(engine);
        assert_eq!(calls.deallocate.load(Ordering::SeqCst), 1);
    }
}
