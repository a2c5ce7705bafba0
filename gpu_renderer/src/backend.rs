// backend.rs - Render backend seam between the scene and a concrete GPU surface

use crate::animation::{Camera, FloorGrid, Lighting};
use crate::error_handling::Result;
use crate::host::{SurfaceId, Viewport};
use crate::instancing::InstanceBatch;

/// Owns one render surface and every GPU resource drawn into it.
///
/// The scene talks to this trait only; `WgpuBackend` draws for real and
/// `NullBackend` records calls for headless runs.
pub trait RenderBackend {
    fn surface(&self) -> SurfaceId;

    /// Output size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Match the output to a new host viewport
    fn resize(&mut self, viewport: Viewport) -> Result<()>;

    fn set_lighting(&mut self, lighting: &Lighting) -> Result<()>;

    fn set_floor(&mut self, floor: &FloorGrid) -> Result<()>;

    /// Replace the GPU copy of one batch, keyed by its kind
    fn upload_instances(&mut self, batch: &InstanceBatch) -> Result<()>;

    /// Draw the full scene once. Fails with `SurfaceReleased` after `dispose`.
    fn render(&mut self, camera: &Camera) -> Result<()>;

    /// Release everything the backend acquired. Safe to call repeatedly.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
