//! Ownership and lifecycle of the native engine instance.
//!
//! ```text
//! Uninitialized --create--> Created --load--> Loaded
//!        |                     |                |
//!        +------destroy--------+----destroy-----+--> Destroyed
//! ```
//!
//! The session is the only holder of the native handle. Inference is only
//! issued in `Loaded`; every other state fails fast with
//! [`LivenessError::Lifecycle`] before touching the engine. The handle is
//! released exactly once, by [`EngineSession::destroy`] or on drop.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::LivenessError;
use crate::frame::Frame;
use crate::native::{NativeEngine, RawHandle};
use crate::region::FaceRegion;

/// Lifecycle state of an [`EngineSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No native instance has been allocated yet.
    Uninitialized,
    /// A native instance exists but holds no models.
    Created,
    /// The model ensemble is loaded; inference is allowed.
    Loaded,
    /// The native instance has been released.
    Destroyed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Created => "created",
            EngineState::Loaded => "loaded",
            EngineState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

enum Slot {
    Uninitialized,
    Created(RawHandle),
    Loaded {
        handle: RawHandle,
        configs: Vec<ModelConfig>,
    },
    Destroyed,
}

/// Owned native engine instance driven through its lifecycle.
pub struct EngineSession {
    engine: Box<dyn NativeEngine>,
    slot: Slot,
}

impl EngineSession {
    /// Take ownership of `engine` without allocating a native instance.
    pub fn new(engine: Box<dyn NativeEngine>) -> Self {
        Self {
            engine,
            slot: Slot::Uninitialized,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        match self.slot {
            Slot::Uninitialized => EngineState::Uninitialized,
            Slot::Created(_) => EngineState::Created,
            Slot::Loaded { .. } => EngineState::Loaded,
            Slot::Destroyed => EngineState::Destroyed,
        }
    }

    /// Models of the loaded ensemble, in ensemble order. Empty unless loaded.
    pub fn configs(&self) -> &[ModelConfig] {
        match &self.slot {
            Slot::Loaded { configs, .. } => configs,
            _ => &[],
        }
    }

    /// Allocate the native instance. Allowed once, from `Uninitialized`.
    pub fn create(&mut self) -> Result<(), LivenessError> {
        self.expect_state("create", &[EngineState::Uninitialized])?;

        let handle = self.engine.allocate();
        if handle == 0 {
            return Err(LivenessError::AllocationFailed);
        }
        debug!("native engine allocated");
        self.slot = Slot::Created(handle);
        Ok(())
    }

    /// Load the model ensemble from `model_dir`.
    ///
    /// An empty ensemble or one with a non-positive input size is rejected
    /// without calling the engine. Loading again from `Loaded` replaces the
    /// ensemble. Any failure leaves the session `Created`, dropping a
    /// previously loaded ensemble.
    pub fn load(&mut self, model_dir: &Path, configs: Vec<ModelConfig>) -> Result<(), LivenessError> {
        let handle = match self.slot {
            Slot::Created(handle) | Slot::Loaded { handle, .. } => handle,
            _ => return Err(self.violation("load")),
        };
        self.slot = Slot::Created(handle);

        if configs.is_empty() {
            warn!("refusing to load an empty model ensemble");
            return Err(LivenessError::EmptyConfig);
        }
        for config in &configs {
            config.validate()?;
        }

        let status = self.engine.load_model(handle, model_dir, &configs);
        if status != 0 {
            warn!(status, "native engine rejected model ensemble");
            return Err(LivenessError::NativeLoad(status));
        }

        info!(
            models = configs.len(),
            model_dir = %model_dir.display(),
            "liveness models loaded"
        );
        self.slot = Slot::Loaded { handle, configs };
        Ok(())
    }

    /// Score `region` in `frame`. Only valid once the ensemble is loaded.
    pub fn invoke(&mut self, frame: &Frame<'_>, region: &FaceRegion) -> Result<f32, LivenessError> {
        let Slot::Loaded { handle, .. } = self.slot else {
            return Err(self.violation("run inference"));
        };

        Ok(self.engine.detect_yuv(
            handle,
            frame.data(),
            frame.width(),
            frame.height(),
            frame.orientation(),
            region.left,
            region.top,
            region.right,
            region.bottom,
        ))
    }

    /// Release the native instance. Later calls do nothing.
    pub fn destroy(&mut self) {
        match std::mem::replace(&mut self.slot, Slot::Destroyed) {
            Slot::Created(handle) | Slot::Loaded { handle, .. } => {
                self.engine.deallocate(handle);
                info!("native engine released");
            }
            Slot::Uninitialized => debug!("engine destroyed before creation"),
            Slot::Destroyed => debug!("engine already destroyed"),
        }
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[EngineState],
    ) -> Result<(), LivenessError> {
        if allowed.contains(&self.state()) {
            Ok(())
        } else {
            Err(self.violation(operation))
        }
    }

    fn violation(&self, operation: &'static str) -> LivenessError {
        let state = self.state();
        warn!(%state, operation, "engine lifecycle violation");
        LivenessError::Lifecycle { operation, state }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.destroy();
    }
}
