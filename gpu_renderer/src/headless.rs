// headless.rs - GPU-free backend that records what the scene asked it to do

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::animation::{Camera, FloorGrid, Lighting};
use crate::backend::RenderBackend;
use crate::error_handling::{Result, SceneError};
use crate::host::{BackendFactory, SurfaceId, Viewport};
use crate::instancing::{BatchKind, InstanceBatch};

/// Shared observation point for every `NullBackend` made by one factory.
#[derive(Debug, Default)]
pub struct NullProbe {
    backends_created: Cell<usize>,
    live_backends: Cell<usize>,
    disposals: Cell<usize>,
    frames_rendered: Cell<usize>,
    wall_uploads: Cell<usize>,
    marker_uploads: Cell<usize>,
    wall_count: Cell<usize>,
    marker_scales: RefCell<Vec<f32>>,
    last_size: Cell<(u32, u32)>,
    last_aspect: Cell<Option<f32>>,
    lighting_set: Cell<bool>,
    floor_divisions: Cell<Option<usize>>,
    fail_on_frame: Cell<Option<usize>>,
    fail_uploads: Cell<bool>,
    refuse_surfaces: Cell<bool>,
}

impl NullProbe {
    /// A probe ready to hand to a `NullBackendFactory`
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Make the `n`th render call (1-based, counted across backends) fail
    pub fn fail_on_frame(&self, n: usize) {
        self.fail_on_frame.set(Some(n));
    }

    /// Make every instance upload fail
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.set(fail);
    }

    pub fn refuse_surfaces(&self, refuse: bool) {
        self.refuse_surfaces.set(refuse);
    }

    pub fn backends_created(&self) -> usize {
        self.backends_created.get()
    }

    pub fn live_backends(&self) -> usize {
        self.live_backends.get()
    }

    pub fn disposals(&self) -> usize {
        self.disposals.get()
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered.get()
    }

    pub fn uploads(&self, kind: BatchKind) -> usize {
        match kind {
            BatchKind::Walls => self.wall_uploads.get(),
            BatchKind::PathMarkers => self.marker_uploads.get(),
        }
    }

    /// Instance count of the last wall upload
    pub fn wall_count(&self) -> usize {
        self.wall_count.get()
    }

    /// Marker scales as of the last marker upload
    pub fn marker_scales(&self) -> Vec<f32> {
        self.marker_scales.borrow().clone()
    }

    pub fn last_size(&self) -> (u32, u32) {
        self.last_size.get()
    }

    /// Camera aspect seen by the last successful render
    pub fn last_aspect(&self) -> Option<f32> {
        self.last_aspect.get()
    }

    pub fn lighting_set(&self) -> bool {
        self.lighting_set.get()
    }

    pub fn floor_divisions(&self) -> Option<usize> {
        self.floor_divisions.get()
    }
}

pub struct NullBackend {
    surface: SurfaceId,
    size: (u32, u32),
    probe: Rc<NullProbe>,
    disposed: bool,
}

impl NullBackend {
    pub fn probe(&self) -> &Rc<NullProbe> {
        &self.probe
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(SceneError::SurfaceReleased);
        }
        Ok(())
    }
}

impl RenderBackend for NullBackend {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_live()?;
        self.size = viewport.physical_size();
        self.probe.last_size.set(self.size);
        Ok(())
    }

    fn set_lighting(&mut self, _lighting: &Lighting) -> Result<()> {
        self.ensure_live()?;
        self.probe.lighting_set.set(true);
        Ok(())
    }

    fn set_floor(&mut self, floor: &FloorGrid) -> Result<()> {
        self.ensure_live()?;
        self.probe.floor_divisions.set(Some(floor.divisions));
        Ok(())
    }

    fn upload_instances(&mut self, batch: &InstanceBatch) -> Result<()> {
        self.ensure_live()?;
        if self.probe.fail_uploads.get() {
            return Err(SceneError::RenderFailed(format!("injected failure uploading {}", batch.kind())));
        }
        match batch.kind() {
            BatchKind::Walls => {
                self.probe.wall_uploads.set(self.probe.wall_uploads.get() + 1);
                self.probe.wall_count.set(batch.len());
            }
            BatchKind::PathMarkers => {
                self.probe.marker_uploads.set(self.probe.marker_uploads.get() + 1);
                *self.probe.marker_scales.borrow_mut() =
                    batch.transforms().iter().map(|t| t.scale).collect();
            }
        }
        Ok(())
    }

    fn render(&mut self, camera: &Camera) -> Result<()> {
        self.ensure_live()?;
        let frame = self.probe.frames_rendered.get() + 1;
        if self.probe.fail_on_frame.get() == Some(frame) {
            return Err(SceneError::RenderFailed(format!("injected failure on frame {frame}")));
        }
        self.probe.frames_rendered.set(frame);
        self.probe.last_aspect.set(Some(camera.aspect));
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.probe.disposals.set(self.probe.disposals.get() + 1);
        self.probe.live_backends.set(self.probe.live_backends.get().saturating_sub(1));
        log::debug!("Disposed headless backend {}", self.surface);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

pub struct NullBackendFactory {
    probe: Rc<NullProbe>,
}

impl NullBackendFactory {
    pub fn new(probe: Rc<NullProbe>) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &Rc<NullProbe> {
        &self.probe
    }
}

impl BackendFactory for NullBackendFactory {
    type Backend = NullBackend;

    fn create(&mut self, surface: SurfaceId, viewport: Viewport) -> Result<NullBackend> {
        if self.probe.refuse_surfaces.get() {
            return Err(SceneError::SurfaceUnavailable {
                reason: "headless probe refuses surfaces".into(),
            });
        }
        let size = viewport.physical_size();
        self.probe.backends_created.set(self.probe.backends_created.get() + 1);
        self.probe.live_backends.set(self.probe.live_backends.get() + 1);
        self.probe.last_size.set(size);
        Ok(NullBackend {
            surface,
            size,
            probe: Rc::clone(&self.probe),
            disposed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, LocalHost};
    use crate::animation::Vec3;
    use crate::instancing::Material;

    #[test]
    fn test_render_after_dispose_fails() {
        let probe = NullProbe::shared();
        let mut host = LocalHost::new(NullBackendFactory::new(probe.clone()), Viewport::new(64, 32));
        let mut backend = host.create_backend(host.viewport()).unwrap();
        let camera = Camera::new(2.0);

        backend.render(&camera).unwrap();
        assert_eq!(probe.frames_rendered(), 1);
        assert_eq!(probe.live_backends(), 1);

        backend.dispose();
        backend.dispose();
        assert!(backend.is_disposed());
        assert_eq!(probe.disposals(), 1);
        assert_eq!(probe.live_backends(), 0);
        assert!(matches!(backend.render(&camera), Err(SceneError::SurfaceReleased)));
    }

    #[test]
    fn test_injected_failures() {
        let probe = NullProbe::shared();
        let mut factory = NullBackendFactory::new(probe.clone());
        let mut backend = factory.create(SurfaceId(1), Viewport::new(8, 8)).unwrap();

        probe.fail_on_frame(2);
        let camera = Camera::new(1.0);
        assert!(backend.render(&camera).is_ok());
        assert!(matches!(backend.render(&camera), Err(SceneError::RenderFailed(_))));
        assert_eq!(probe.frames_rendered(), 1);

        probe.fail_uploads(true);
        let batch = InstanceBatch::new(BatchKind::Walls, Vec3::new(1.0, 1.0, 1.0), Material::wall());
        assert!(matches!(backend.upload_instances(&batch), Err(SceneError::RenderFailed(_))));
        assert_eq!(probe.uploads(BatchKind::Walls), 0);

        probe.refuse_surfaces(true);
        assert!(matches!(
            factory.create(SurfaceId(2), Viewport::new(8, 8)),
            Err(SceneError::SurfaceUnavailable { .. })
        ));
        assert_eq!(probe.backends_created(), 1);
    }
}
