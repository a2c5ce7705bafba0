// lib.rs - Library exports for maze-gpu-renderer
// Scene lifecycle, host contracts and render backends around maze-core

pub mod animation;
pub mod backend;
pub mod error_handling;
pub mod headless;
pub mod host;
pub mod instancing;
pub mod scene;
pub mod wgpu_backend;

// Re-export commonly used types
pub use animation::{Camera, CameraOrbit, Color, FloorGrid, Lighting, PathReveal, Vec3};
pub use backend::RenderBackend;
pub use error_handling::{Result, SceneError};
pub use headless::{NullBackend, NullBackendFactory, NullProbe};
pub use host::{BackendFactory, FrameHandle, Host, ListenerId, LocalHost, SurfaceId, Viewport};
pub use instancing::{BatchKind, GridLayout, InstanceBatch, InstanceRaw};
pub use scene::{FrameStatus, MazeDimensions, MazeScene};
pub use wgpu_backend::{GpuContext, WgpuBackend};
