// error_handling.rs - Scene errors, readback helpers and GPU resource accounting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use maze_core::MazeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Maze generation failed: {0}")]
    InvalidMaze(#[from] MazeError),

    #[error("WebGPU adapter creation failed")]
    AdapterCreationFailed,

    #[error("WebGPU device creation failed: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    #[error("Render surface could not be acquired: {reason}")]
    SurfaceUnavailable { reason: String },

    #[error("Render surface has already been released")]
    SurfaceReleased,

    #[error("Frame render failed: {0}")]
    RenderFailed(String),

    #[error("Buffer operation failed: {message}")]
    BufferError { message: String },

    #[error("Buffer mapping timeout after {elapsed:?}")]
    MappingTimeout { elapsed: Duration },

    #[error("Image processing failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;

/// Compute aligned bytes per row for texture copies (must be multiple of 256)
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Remove row padding from texture data
pub fn unpad_rows(padded_data: &[u8], width: u32, height: u32, bytes_per_pixel: u32) -> Vec<u8> {
    let unpadded_bpr = (width * bytes_per_pixel) as usize;
    let padded_bpr = padded_bytes_per_row(width, bytes_per_pixel) as usize;

    if unpadded_bpr == padded_bpr {
        return padded_data[..unpadded_bpr * height as usize].to_vec();
    }

    padded_data
        .chunks(padded_bpr)
        .take(height as usize)
        .flat_map(|row| &row[..unpadded_bpr])
        .copied()
        .collect()
}

/// Map a buffer slice for reading, polling the device until the callback
/// fires or `timeout` elapses.
pub async fn map_read_with_timeout(
    device: &wgpu::Device,
    slice: wgpu::BufferSlice<'_>,
    timeout: Duration,
) -> Result<()> {
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });

    let mapped = tokio::time::timeout(timeout, async {
        loop {
            device.poll(wgpu::Maintain::Poll);
            match rx.try_recv() {
                Ok(res) => break Ok(res),
                Err(tokio::sync::oneshot::error::TryRecvError::Closed) => break Err(()),
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {}
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .map_err(|_| SceneError::MappingTimeout { elapsed: timeout })?;

    match mapped {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SceneError::BufferError {
            message: format!("Buffer mapping failed: {e:?}"),
        }),
        Err(()) => Err(SceneError::BufferError {
            message: "Buffer mapping callback dropped".into(),
        }),
    }
}

/// Counts live GPU resources so teardown can be checked for leaks.
pub struct ResourceTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    active_buffers: AtomicU64,
    active_textures: AtomicU64,
    active_pipelines: AtomicU64,
}

impl ResourceTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(TrackerInner::default()),
        })
    }

    pub fn track(self: &Arc<Self>, resource_type: ResourceType) -> TrackedResource {
        self.counter(resource_type).fetch_add(1, Ordering::AcqRel);
        TrackedResource {
            tracker: Arc::downgrade(&self.inner),
            resource_type,
        }
    }

    /// (buffers, textures, pipelines) currently alive
    pub fn active_resources(&self) -> (u64, u64, u64) {
        (
            self.inner.active_buffers.load(Ordering::Acquire),
            self.inner.active_textures.load(Ordering::Acquire),
            self.inner.active_pipelines.load(Ordering::Acquire),
        )
    }

    pub fn total_active(&self) -> u64 {
        let (b, t, p) = self.active_resources();
        b + t + p
    }

    fn counter(&self, resource_type: ResourceType) -> &AtomicU64 {
        self.inner.counter(resource_type)
    }
}

impl TrackerInner {
    fn counter(&self, resource_type: ResourceType) -> &AtomicU64 {
        match resource_type {
            ResourceType::Buffer => &self.active_buffers,
            ResourceType::Texture => &self.active_textures,
            ResourceType::Pipeline => &self.active_pipelines,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Buffer,
    Texture,
    Pipeline,
}

/// Decrements its tracker count when dropped
pub struct TrackedResource {
    tracker: Weak<TrackerInner>,
    resource_type: ResourceType,
}

impl Drop for TrackedResource {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.counter(self.resource_type).fetch_sub(1, Ordering::AcqRel);
        }
    }
}
