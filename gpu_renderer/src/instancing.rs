// instancing.rs - Grid-to-world layout and per-instance transform batches
//
// Walls and path markers are drawn as two instanced boxes. Each batch keeps its
// transforms in one contiguous Vec and a single dirty flag; the backend only
// re-uploads a batch after something set the flag.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use maze_core::{Coord, Grid, Path};

use crate::animation::{Color, Vec3};

// ============================================================================
// SCENE CONSTANTS
// ============================================================================

pub const CELL_SIZE: f32 = 1.0;

pub const WALL_EXTENT: Vec3 = Vec3::new(1.0, 1.6, 1.0);
pub const WALL_HEIGHT: f32 = 0.8;
pub const WALL_COLOR: u32 = 0x111827;

pub const MARKER_EXTENT: Vec3 = Vec3::new(0.9, 0.6, 0.9);
pub const MARKER_HEIGHT: f32 = 0.3;
pub const MARKER_COLOR: u32 = 0xffcc00;
pub const MARKER_EMISSIVE: u32 = 0xffaa00;
pub const MARKER_EMISSIVE_INTENSITY: f32 = 0.3;

/// Scale of a marker that has not been revealed yet
pub const COLLAPSED_SCALE: f32 = 0.001;
pub const REVEALED_SCALE: f32 = 1.0;

// ============================================================================
// LAYOUT
// ============================================================================

/// Maps grid coordinates onto the world XZ plane, centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub width: usize,
    pub height: usize,
    pub cell_size: f32,
}

impl GridLayout {
    pub fn new(width: usize, height: usize, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size,
        }
    }

    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.width(), grid.height(), CELL_SIZE)
    }

    /// World position of a cell centre, lifted to `height_offset`.
    /// Halves are real-valued, so odd widths leave cells off the integer lattice.
    pub fn to_world(&self, coord: Coord, height_offset: f32) -> Vec3 {
        let half_w = self.width as f32 / 2.0;
        let half_h = self.height as f32 / 2.0;
        Vec3::new(
            (coord.x as f32 - half_w) * self.cell_size,
            height_offset,
            (coord.y as f32 - half_h) * self.cell_size,
        )
    }
}

// ============================================================================
// MATERIAL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
}

impl Material {
    pub fn wall() -> Self {
        Self {
            color: Color::from_hex(WALL_COLOR),
            emissive: Color::BLACK,
            emissive_intensity: 0.0,
        }
    }

    pub fn marker() -> Self {
        Self {
            color: Color::from_hex(MARKER_COLOR),
            emissive: Color::from_hex(MARKER_EMISSIVE),
            emissive_intensity: MARKER_EMISSIVE_INTENSITY,
        }
    }
}

// ============================================================================
// BATCHES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Walls,
    PathMarkers,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Walls => write!(f, "walls"),
            BatchKind::PathMarkers => write!(f, "path markers"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub scale: f32,
}

/// One instanced draw: shared box extent and material, per-instance transforms.
#[derive(Debug, Clone)]
pub struct InstanceBatch {
    kind: BatchKind,
    extent: Vec3,
    material: Material,
    transforms: Vec<InstanceTransform>,
    dirty: bool,
}

impl InstanceBatch {
    pub fn new(kind: BatchKind, extent: Vec3, material: Material) -> Self {
        Self {
            kind,
            extent,
            material,
            transforms: Vec::new(),
            dirty: true,
        }
    }

    /// One full-size wall box per WALL cell, row-major order
    pub fn walls(grid: &Grid, layout: &GridLayout) -> Self {
        let mut batch = Self::new(BatchKind::Walls, WALL_EXTENT, Material::wall());
        batch.transforms = grid
            .wall_cells()
            .map(|c| InstanceTransform {
                position: layout.to_world(c, WALL_HEIGHT),
                scale: REVEALED_SCALE,
            })
            .collect();
        batch
    }

    /// One collapsed marker per path cell, in path order
    pub fn path_markers(path: &Path, layout: &GridLayout) -> Self {
        let mut batch = Self::new(BatchKind::PathMarkers, MARKER_EXTENT, Material::marker());
        batch.transforms = path
            .iter()
            .map(|c| InstanceTransform {
                position: layout.to_world(c, MARKER_HEIGHT),
                scale: COLLAPSED_SCALE,
            })
            .collect();
        batch
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    pub fn extent(&self) -> Vec3 {
        self.extent
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    pub fn scale(&self, index: usize) -> Option<f32> {
        self.transforms.get(index).map(|t| t.scale)
    }

    /// Returns false when `index` is out of range.
    pub fn set_scale(&mut self, index: usize, scale: f32) -> bool {
        match self.transforms.get_mut(index) {
            Some(t) => {
                t.scale = scale;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and reset the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn clear(&mut self) {
        self.transforms.clear();
        self.dirty = true;
    }

    pub fn to_raw(&self) -> Vec<InstanceRaw> {
        let color: [f32; 4] = self.material.color.to_linear().into();
        let emissive: [f32; 4] = self
            .material
            .emissive
            .to_linear()
            .scaled(self.material.emissive_intensity)
            .into();

        self.transforms
            .iter()
            .map(|t| InstanceRaw::new(t.position, self.extent * t.scale, color, emissive))
            .collect()
    }
}

// ============================================================================
// GPU LAYOUT
// ============================================================================

/// Per-instance vertex data: model matrix columns, base colour, emissive
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model_0: [f32; 4],
    pub model_1: [f32; 4],
    pub model_2: [f32; 4],
    pub model_3: [f32; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<InstanceRaw>(), 96);

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    /// Translation times axis-aligned scale
    pub fn new(position: Vec3, size: Vec3, color: [f32; 4], emissive: [f32; 4]) -> Self {
        Self {
            model_0: [size.x, 0.0, 0.0, 0.0],
            model_1: [0.0, size.y, 0.0, 0.0],
            model_2: [0.0, 0.0, size.z, 0.0],
            model_3: [position.x, position.y, position.z, 1.0],
            color,
            emissive,
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_core::{generate_seeded, shortest_path};

    #[test]
    fn test_to_world_uses_real_division() {
        let layout = GridLayout::new(51, 31, 1.0);
        let p = layout.to_world(Coord::new(0, 0), 0.8);
        assert_eq!(p, Vec3::new(-25.5, 0.8, -15.5));

        let p = layout.to_world(Coord::new(50, 30), 0.0);
        assert_eq!(p, Vec3::new(24.5, 0.0, 14.5));

        let layout = GridLayout::new(51, 31, 2.0);
        assert_eq!(layout.to_world(Coord::new(1, 1), 0.3).x, -49.0);
    }

    #[test]
    fn test_wall_batch_covers_every_wall() {
        let grid = generate_seeded(21, 11, 3).unwrap();
        let layout = GridLayout::for_grid(&grid);
        let walls = InstanceBatch::walls(&grid, &layout);

        assert_eq!(walls.kind(), BatchKind::Walls);
        assert_eq!(walls.len(), grid.wall_cells().count());
        assert_eq!(walls.len() + grid.open_count(), 21 * 11);
        assert!(walls.transforms().iter().all(|t| t.scale == 1.0));
        assert!(walls.transforms().iter().all(|t| t.position.y == WALL_HEIGHT));
    }

    #[test]
    fn test_markers_start_collapsed_in_path_order() {
        let grid = generate_seeded(21, 11, 3).unwrap();
        let layout = GridLayout::for_grid(&grid);
        let path = shortest_path(&grid, Coord::new(1, 1), Coord::new(19, 9));
        let markers = InstanceBatch::path_markers(&path, &layout);

        assert_eq!(markers.len(), path.len());
        for (t, c) in markers.transforms().iter().zip(path.iter()) {
            assert_eq!(t.scale, COLLAPSED_SCALE);
            assert_eq!(t.position, layout.to_world(c, MARKER_HEIGHT));
        }
    }

    #[test]
    fn test_dirty_flag() {
        let mut batch = InstanceBatch::new(BatchKind::PathMarkers, MARKER_EXTENT, Material::marker());
        assert!(batch.take_dirty());
        assert!(!batch.take_dirty());

        // Out of range: no mutation, no flag
        assert!(!batch.set_scale(0, 1.0));
        assert!(!batch.is_dirty());

        batch.transforms.push(InstanceTransform {
            position: Vec3::zero(),
            scale: COLLAPSED_SCALE,
        });
        assert!(batch.set_scale(0, 1.0));
        assert_eq!(batch.scale(0), Some(1.0));
        assert!(batch.take_dirty());
        assert!(!batch.is_dirty());
    }

    #[test]
    fn test_raw_model_matrix() {
        let raw = InstanceRaw::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.9, 0.6, 0.9),
            [1.0; 4],
            [0.0; 4],
        );
        let m = glam::Mat4::from_cols_array_2d(&[raw.model_0, raw.model_1, raw.model_2, raw.model_3]);
        let corner = m.transform_point3(glam::Vec3::new(0.5, 0.5, 0.5));
        assert!((corner - glam::Vec3::new(1.45, 2.3, 3.45)).length() < 1e-6);
    }

    #[test]
    fn test_emissive_only_on_markers() {
        let mut walls = InstanceBatch::new(BatchKind::Walls, WALL_EXTENT, Material::wall());
        walls.transforms.push(InstanceTransform {
            position: Vec3::zero(),
            scale: 1.0,
        });
        assert_eq!(walls.to_raw()[0].emissive, [0.0, 0.0, 0.0, 1.0]);

        let mut markers = InstanceBatch::new(BatchKind::PathMarkers, MARKER_EXTENT, Material::marker());
        markers.transforms.push(InstanceTransform {
            position: Vec3::zero(),
            scale: COLLAPSED_SCALE,
        });
        let raw = markers.to_raw()[0];
        // 0xffaa00 linearised, times 0.3
        assert!((raw.emissive[0] - 0.3).abs() < 1e-6);
        assert_eq!(raw.emissive[2], 0.0);
        assert!((raw.model_0[0] - 0.9 * COLLAPSED_SCALE).abs() < 1e-9);
    }
}
