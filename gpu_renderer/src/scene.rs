// scene.rs - Maze scene: mount, per-frame reveal and orbit, resize, teardown
//
// Generation and solving run once, synchronously, inside `mount`. After that the
// scene only moves when the host calls back: one `on_frame` per requested frame,
// `on_resize` when the viewport changes, and `teardown` on unmount.

use rand::Rng;
use serde::{Deserialize, Serialize};

use maze_core::grid::validate_dimensions;
use maze_core::{generate, shortest_path, Coord, Grid, MazeError, Path};

use crate::animation::{Camera, CameraOrbit, FloorGrid, Lighting, PathReveal};
use crate::backend::RenderBackend;
use crate::error_handling::Result;
use crate::host::{BackendFactory, FrameHandle, Host, ListenerId, LocalHost, SurfaceId, Viewport};
use crate::instancing::{GridLayout, InstanceBatch, CELL_SIZE};

// ============================================================================
// DIMENSIONS
// ============================================================================

/// Maze size in cells; both sides odd and at least 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDimensions")]
pub struct MazeDimensions {
    width: usize,
    height: usize,
}

#[derive(Deserialize)]
struct RawDimensions {
    width: usize,
    height: usize,
}

impl TryFrom<RawDimensions> for MazeDimensions {
    type Error = MazeError;

    fn try_from(raw: RawDimensions) -> std::result::Result<Self, MazeError> {
        MazeDimensions::new(raw.width, raw.height)
    }
}

impl Default for MazeDimensions {
    fn default() -> Self {
        Self {
            width: 51,
            height: 31,
        }
    }
}

impl MazeDimensions {
    pub fn new(width: usize, height: usize) -> std::result::Result<Self, MazeError> {
        validate_dimensions(width, height)?;
        Ok(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Fixed start of the solved path
    pub fn start(&self) -> Coord {
        Coord::new(1, 1)
    }

    /// Fixed end of the solved path, the opposite inner corner
    pub fn end(&self) -> Coord {
        Coord::new(self.width - 2, self.height - 2)
    }
}

/// Outcome of one frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Scene advanced and drew; the next frame is requested
    Rendered,
    /// Stale handle or scene no longer mounted; nothing happened
    Skipped,
    /// Render failed; error reported to the host and scheduling stopped
    Aborted,
}

// ============================================================================
// SCENE
// ============================================================================

/// Everything built between acquiring the surface and registering callbacks
struct SceneContent {
    grid: Grid,
    path: Path,
    layout: GridLayout,
    camera: Camera,
    lighting: Lighting,
    floor: FloorGrid,
    walls: InstanceBatch,
    markers: InstanceBatch,
}

pub struct MazeScene<H: Host> {
    host: H,
    backend: H::Backend,
    surface: Option<SurfaceId>,
    listener: Option<ListenerId>,
    frame: Option<FrameHandle>,
    mounted: bool,

    dimensions: MazeDimensions,
    grid: Grid,
    path: Path,
    layout: GridLayout,
    camera: Camera,
    orbit: CameraOrbit,
    lighting: Lighting,
    floor: FloorGrid,
    walls: InstanceBatch,
    markers: InstanceBatch,
    reveal: PathReveal,
    frames_rendered: u64,
}

impl<H: Host> MazeScene<H> {
    /// Build the scene into `host` and request the first frame.
    ///
    /// On failure after the surface was acquired, the surface is disposed and
    /// detached before the error is returned.
    pub fn mount<R: Rng + ?Sized>(host: H, dimensions: MazeDimensions, rng: &mut R) -> Result<Self> {
        validate_dimensions(dimensions.width, dimensions.height)?;
        Self::mount_with(host, dimensions, |dims| generate(dims.width, dims.height, rng))
    }

    /// Mount an already built grid, e.g. one restored from a JSON dump.
    ///
    /// The grid is used as is. If it has no path between the fixed endpoints
    /// only the walls are shown.
    pub fn mount_grid(host: H, grid: Grid) -> Result<Self> {
        let dimensions = MazeDimensions::new(grid.width(), grid.height())?;
        Self::mount_with(host, dimensions, move |_| Ok(grid))
    }

    fn mount_with<F>(mut host: H, dimensions: MazeDimensions, make_grid: F) -> Result<Self>
    where
        F: FnOnce(MazeDimensions) -> std::result::Result<Grid, MazeError>,
    {
        let viewport = host.viewport();
        let mut backend = host.create_backend(viewport)?;
        let surface = backend.surface();
        host.attach(surface);

        let content = match Self::build_content(&mut backend, dimensions, viewport, make_grid) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Scene setup failed, releasing {surface}: {e}");
                backend.dispose();
                host.detach(surface);
                return Err(e);
            }
        };

        let listener = host.add_resize_listener();
        let frame = host.request_frame();

        log::info!(
            "Mounted {}x{} maze on {surface}: {} walls, path of {} cells",
            dimensions.width,
            dimensions.height,
            content.walls.len(),
            content.path.len()
        );

        Ok(Self {
            host,
            backend,
            surface: Some(surface),
            listener: Some(listener),
            frame: Some(frame),
            mounted: true,
            dimensions,
            reveal: PathReveal::new(content.path.len()),
            grid: content.grid,
            path: content.path,
            layout: content.layout,
            camera: content.camera,
            orbit: CameraOrbit::new(),
            lighting: content.lighting,
            floor: content.floor,
            walls: content.walls,
            markers: content.markers,
            frames_rendered: 0,
        })
    }

    fn build_content<F>(
        backend: &mut H::Backend,
        dimensions: MazeDimensions,
        viewport: Viewport,
        make_grid: F,
    ) -> Result<SceneContent>
    where
        F: FnOnce(MazeDimensions) -> std::result::Result<Grid, MazeError>,
    {
        let camera = Camera::new(viewport.aspect());

        let lighting = Lighting::default();
        backend.set_lighting(&lighting)?;

        let grid = make_grid(dimensions)?;
        let layout = GridLayout::for_grid(&grid);

        let floor = FloorGrid::new(dimensions.width, CELL_SIZE);
        backend.set_floor(&floor)?;

        let mut walls = InstanceBatch::walls(&grid, &layout);

        let path = shortest_path(&grid, dimensions.start(), dimensions.end());
        if path.is_empty() {
            log::warn!(
                "No path from {} to {}; rendering walls only",
                dimensions.start(),
                dimensions.end()
            );
        }
        let mut markers = InstanceBatch::path_markers(&path, &layout);

        backend.upload_instances(&walls)?;
        walls.take_dirty();
        backend.upload_instances(&markers)?;
        markers.take_dirty();

        Ok(SceneContent {
            grid,
            path,
            layout,
            camera,
            lighting,
            floor,
            walls,
            markers,
        })
    }

    /// Per-frame callback. Only the currently registered handle does work.
    pub fn on_frame(&mut self, frame: FrameHandle) -> FrameStatus {
        if !self.mounted || self.frame != Some(frame) {
            log::trace!("Skipping {frame}");
            return FrameStatus::Skipped;
        }
        self.frame = None;

        self.orbit.advance(&mut self.camera);
        self.reveal.advance(&mut self.markers);

        if let Err(e) = Self::draw(&mut self.backend, &mut self.markers, &self.camera) {
            log::error!("Frame loop aborted after {} frames: {e}", self.frames_rendered);
            self.host.report_error(&e);
            return FrameStatus::Aborted;
        }

        self.frames_rendered += 1;
        self.frame = Some(self.host.request_frame());
        FrameStatus::Rendered
    }

    fn draw(backend: &mut H::Backend, markers: &mut InstanceBatch, camera: &Camera) -> Result<()> {
        if markers.take_dirty() {
            backend.upload_instances(markers)?;
        }
        backend.render(camera)
    }

    /// Viewport changed: resize the output and the camera projection only.
    pub fn on_resize(&mut self, viewport: Viewport) -> Result<()> {
        if !self.mounted {
            log::debug!("Ignoring resize on unmounted scene");
            return Ok(());
        }
        self.backend.resize(viewport)?;
        self.camera.set_aspect(viewport.aspect());
        log::debug!(
            "Resized to {}x{} (aspect {:.3})",
            viewport.width,
            viewport.height,
            viewport.aspect()
        );
        Ok(())
    }

    /// Release everything acquired at mount. Safe to call more than once.
    pub fn teardown(&mut self) {
        let was_mounted = self.mounted;
        self.mounted = false;

        if let Some(listener) = self.listener.take() {
            self.host.remove_resize_listener(listener);
        }
        if let Some(frame) = self.frame.take() {
            self.host.cancel_frame(frame);
        }
        self.backend.dispose();
        self.walls.clear();
        self.markers.clear();
        if let Some(surface) = self.surface.take() {
            if self.host.is_attached(surface) {
                self.host.detach(surface);
            }
        }

        if was_mounted {
            log::info!("Scene torn down after {} frames", self.frames_rendered);
        }
    }

    pub fn dimensions(&self) -> MazeDimensions {
        self.dimensions
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn floor(&self) -> &FloorGrid {
        &self.floor
    }

    pub fn walls(&self) -> &InstanceBatch {
        &self.walls
    }

    pub fn markers(&self) -> &InstanceBatch {
        &self.markers
    }

    pub fn reveal(&self) -> &PathReveal {
        &self.reveal
    }

    pub fn backend(&self) -> &H::Backend {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl<F: BackendFactory> MazeScene<LocalHost<F>> {
    /// Deliver the host's due frame callback, if any
    pub fn run_pending_frame(&mut self) -> Option<FrameStatus> {
        let frame = self.host.next_frame()?;
        Some(self.on_frame(frame))
    }

    /// Change the host viewport and notify the scene if it is listening
    pub fn resize_host(&mut self, viewport: Viewport) -> Result<()> {
        if self.host.set_viewport(viewport) {
            self.on_resize(viewport)?;
        }
        Ok(())
    }
}

impl<H: Host> Drop for MazeScene<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_validate() {
        assert!(MazeDimensions::new(51, 31).is_ok());
        assert_eq!(
            MazeDimensions::new(50, 31),
            Err(MazeError::InvalidDimension { width: 50, height: 31 })
        );
        assert!(MazeDimensions::new(1, 3).is_err());

        let dims = MazeDimensions::default();
        assert_eq!((dims.width(), dims.height()), (51, 31));
        assert_eq!(dims.start(), Coord::new(1, 1));
        assert_eq!(dims.end(), Coord::new(49, 29));
    }

    #[test]
    fn test_dimensions_deserialize_validates() {
        let dims: MazeDimensions = serde_json::from_str(r#"{"width":7,"height":5}"#).unwrap();
        assert_eq!(dims, MazeDimensions::new(7, 5).unwrap());

        assert!(serde_json::from_str::<MazeDimensions>(r#"{"width":8,"height":5}"#).is_err());
    }
}
