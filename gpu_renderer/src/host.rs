// host.rs - Host contracts: viewport, mount point, resize listeners, frame callbacks
//
// The scene never owns an event loop. A host hands it a render surface, tells it
// when the viewport changes and calls back once per requested frame.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::RenderBackend;
use crate::error_handling::{Result, SceneError};

// ============================================================================
// VIEWPORT AND IDS
// ============================================================================

/// Host viewport in logical pixels plus the device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale_factor: 1.0,
        }
    }

    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        self
    }

    /// Width over height, both clamped to at least one pixel
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Render target size: logical size times the pixel ratio, each at least 1
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.scale_factor).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

macro_rules! opaque_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u64);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

opaque_id!(SurfaceId, "surface");
opaque_id!(FrameHandle, "frame");
opaque_id!(ListenerId, "listener");

// ============================================================================
// CONTRACTS
// ============================================================================

/// Everything the scene needs from whoever mounts it.
pub trait Host {
    type Backend: RenderBackend;

    fn viewport(&self) -> Viewport;

    /// Acquire a render surface sized to `viewport`
    fn create_backend(&mut self, viewport: Viewport) -> Result<Self::Backend>;

    /// Put the surface into the mount point
    fn attach(&mut self, surface: SurfaceId);

    fn detach(&mut self, surface: SurfaceId);

    fn is_attached(&self, surface: SurfaceId) -> bool;

    fn add_resize_listener(&mut self) -> ListenerId;

    fn remove_resize_listener(&mut self, listener: ListenerId);

    /// Register for one callback on the next frame
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, frame: FrameHandle);

    /// Host-side error channel for failures inside the frame loop
    fn report_error(&mut self, error: &SceneError) {
        log::error!("Scene error: {error}");
    }
}

/// Lend a host to a scene while keeping ownership
impl<H: Host + ?Sized> Host for &mut H {
    type Backend = H::Backend;

    fn viewport(&self) -> Viewport {
        (**self).viewport()
    }

    fn create_backend(&mut self, viewport: Viewport) -> Result<Self::Backend> {
        (**self).create_backend(viewport)
    }

    fn attach(&mut self, surface: SurfaceId) {
        (**self).attach(surface)
    }

    fn detach(&mut self, surface: SurfaceId) {
        (**self).detach(surface)
    }

    fn is_attached(&self, surface: SurfaceId) -> bool {
        (**self).is_attached(surface)
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        (**self).add_resize_listener()
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) {
        (**self).remove_resize_listener(listener)
    }

    fn request_frame(&mut self) -> FrameHandle {
        (**self).request_frame()
    }

    fn cancel_frame(&mut self, frame: FrameHandle) {
        (**self).cancel_frame(frame)
    }

    fn report_error(&mut self, error: &SceneError) {
        (**self).report_error(error)
    }
}

/// Creates backends for surfaces handed out by a host
pub trait BackendFactory {
    type Backend: RenderBackend;

    fn create(&mut self, surface: SurfaceId, viewport: Viewport) -> Result<Self::Backend>;
}

// ============================================================================
// LOCAL HOST
// ============================================================================

/// Single-threaded host for the driver binary and tests.
///
/// Holds at most one registered frame; a new request replaces the old one.
pub struct LocalHost<F: BackendFactory> {
    factory: F,
    viewport: Viewport,
    attached: BTreeSet<SurfaceId>,
    listeners: BTreeSet<ListenerId>,
    pending: Option<FrameHandle>,
    next_id: u64,
    last_error: Option<String>,
    errors_reported: usize,
}

impl<F: BackendFactory> LocalHost<F> {
    pub fn new(factory: F, viewport: Viewport) -> Self {
        Self {
            factory,
            viewport,
            attached: BTreeSet::new(),
            listeners: BTreeSet::new(),
            pending: None,
            next_id: 1,
            last_error: None,
            errors_reported: 0,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Take the due frame callback, if one is registered
    pub fn next_frame(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    /// Change the viewport. Returns whether anyone is listening for resizes.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        self.viewport = viewport;
        !self.listeners.is_empty()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn errors_reported(&self) -> usize {
        self.errors_reported
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl<F: BackendFactory> Host for LocalHost<F> {
    type Backend = F::Backend;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn create_backend(&mut self, viewport: Viewport) -> Result<Self::Backend> {
        let surface = SurfaceId(self.allocate_id());
        log::debug!("Creating backend for {surface} at {}x{}", viewport.width, viewport.height);
        self.factory.create(surface, viewport)
    }

    fn attach(&mut self, surface: SurfaceId) {
        self.attached.insert(surface);
    }

    fn detach(&mut self, surface: SurfaceId) {
        self.attached.remove(&surface);
    }

    fn is_attached(&self, surface: SurfaceId) -> bool {
        self.attached.contains(&surface)
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.allocate_id());
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn request_frame(&mut self) -> FrameHandle {
        let frame = FrameHandle(self.allocate_id());
        if let Some(replaced) = self.pending.replace(frame) {
            log::trace!("{frame} replaces pending {replaced}");
        }
        frame
    }

    fn cancel_frame(&mut self, frame: FrameHandle) {
        if self.pending == Some(frame) {
            self.pending = None;
        }
    }

    fn report_error(&mut self, error: &SceneError) {
        log::error!("Scene error: {error}");
        self.last_error = Some(error.to_string());
        self.errors_reported += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{NullBackendFactory, NullProbe};

    fn host() -> LocalHost<NullBackendFactory> {
        LocalHost::new(NullBackendFactory::new(NullProbe::shared()), Viewport::new(800, 600))
    }

    #[test]
    fn test_viewport_sizes() {
        let vp = Viewport::new(800, 600).with_scale_factor(2.0);
        assert_eq!(vp.physical_size(), (1600, 1200));
        assert!((vp.aspect() - 4.0 / 3.0).abs() < 1e-6);

        let zero = Viewport::new(0, 0).with_scale_factor(f32::NAN);
        assert_eq!(zero.scale_factor, 1.0);
        assert_eq!(zero.physical_size(), (1, 1));
        assert_eq!(zero.aspect(), 1.0);
    }

    #[test]
    fn test_single_pending_frame() {
        let mut host = host();
        let a = host.request_frame();
        let b = host.request_frame();
        assert_ne!(a, b);
        assert_eq!(host.pending_frame(), Some(b));

        host.cancel_frame(a);
        assert_eq!(host.pending_frame(), Some(b));

        assert_eq!(host.next_frame(), Some(b));
        assert_eq!(host.next_frame(), None);
    }

    #[test]
    fn test_listeners_and_attachment() {
        let mut host = host();
        assert!(!host.set_viewport(Viewport::new(10, 10)));

        let listener = host.add_resize_listener();
        assert!(host.set_viewport(Viewport::new(20, 10)));
        assert_eq!(host.viewport(), Viewport::new(20, 10));

        host.remove_resize_listener(listener);
        host.remove_resize_listener(listener);
        assert_eq!(host.listener_count(), 0);

        let backend = host.create_backend(host.viewport()).unwrap();
        let surface = backend.surface();
        host.attach(surface);
        assert!(host.is_attached(surface));
        host.detach(surface);
        assert!(!host.is_attached(surface));
        assert_eq!(host.attached_count(), 0);
    }

    #[test]
    fn test_report_error_is_recorded() {
        let mut host = host();
        host.report_error(&SceneError::SurfaceReleased);
        assert_eq!(host.errors_reported(), 1);
        assert!(host.last_error().unwrap().contains("released"));
    }
}
