// wgpu_backend.rs - Offscreen wgpu render surface for the maze scene
//
// One GpuContext (adapter + device) hands out WgpuBackends. Each backend draws
// into its own sRGB colour target and depth texture; frames can be read back
// as RGBA or PNG.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use image::{ImageBuffer, ImageFormat, Rgba};
use wgpu::util::DeviceExt;

use crate::animation::{Camera, FloorGrid, Lighting};
use crate::backend::RenderBackend;
use crate::error_handling::{
    map_read_with_timeout, padded_bytes_per_row, unpad_rows, ResourceTracker, ResourceType, Result,
    SceneError, TrackedResource,
};
use crate::host::{BackendFactory, SurfaceId, Viewport};
use crate::instancing::{BatchKind, InstanceBatch, InstanceRaw};

const SHADER_SOURCE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/shaders/maze_scene.wgsl"));

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const READBACK_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// GPU LAYOUTS
// ============================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
    light_color: [f32; 4],
    light_dir: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<SceneUniforms>(), 144);

impl SceneUniforms {
    pub fn new(camera: &Camera, lighting: &Lighting) -> Self {
        let premultiplied = |c: crate::animation::Color, intensity: f32| -> [f32; 4] {
            c.to_linear().scaled(intensity).into()
        };
        let dir = lighting.direction_to_light();
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: [camera.position.x, camera.position.y, camera.position.z, 1.0],
            sky_color: premultiplied(lighting.sky_color, lighting.hemisphere_intensity),
            ground_color: premultiplied(lighting.ground_color, lighting.hemisphere_intensity),
            light_color: premultiplied(lighting.directional_color, lighting.directional_intensity),
            light_dir: [dir.x, dir.y, dir.z, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct BoxVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LineVertex {
    position: [f32; 3],
    color: [f32; 4],
}

/// Unit box centred on the origin, counter-clockwise faces seen from outside
fn box_mesh() -> (Vec<BoxVertex>, Vec<u16>) {
    // (normal, u, v) with u x v = normal
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    const CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let base = vertices.len() as u16;
        for (su, sv) in CORNERS {
            let position = std::array::from_fn(|i| normal[i] * 0.5 + u[i] * su + v[i] * sv);
            vertices.push(BoxVertex { position, normal });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    (vertices, indices)
}

fn floor_vertices(floor: &FloorGrid) -> Vec<LineVertex> {
    floor
        .lines()
        .into_iter()
        .flat_map(|(a, b, color)| {
            let color: [f32; 4] = color.to_linear().into();
            [
                LineVertex { position: a.into(), color },
                LineVertex { position: b.into(), color },
            ]
        })
        .collect()
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Adapter and device shared by every backend it creates
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    tracker: Arc<ResourceTracker>,
}

impl GpuContext {
    pub async fn new(prefer_vulkan: bool) -> Result<Self> {
        let backends = if prefer_vulkan || std::env::var("WGPU_BACKEND").as_deref() == Ok("vulkan") {
            wgpu::Backends::VULKAN
        } else {
            wgpu::Backends::PRIMARY
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            flags: wgpu::InstanceFlags::empty(),
            dx12_shader_compiler: Default::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SceneError::AdapterCreationFailed)?;

        let info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Maze Scene Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
                        ..Default::default()
                    },
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            log::error!("Uncaptured wgpu error: {e}");
        }));

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name: info.name,
            tracker: ResourceTracker::new(),
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn tracker(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }
}

impl BackendFactory for GpuContext {
    type Backend = WgpuBackend;

    fn create(&mut self, surface: SurfaceId, viewport: Viewport) -> Result<WgpuBackend> {
        WgpuBackend::new(
            Arc::clone(&self.device),
            Arc::clone(&self.queue),
            Arc::clone(&self.tracker),
            surface,
            viewport,
        )
    }
}

// ============================================================================
// BACKEND
// ============================================================================

struct RenderTargets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    _tracked: [TrackedResource; 2],
}

impl RenderTargets {
    fn new(device: &wgpu::Device, tracker: &Arc<ResourceTracker>, (width, height): (u32, u32)) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Maze Color Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Maze Depth Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            color_view: color.create_view(&Default::default()),
            depth_view: depth.create_view(&Default::default()),
            color,
            depth,
            _tracked: [
                tracker.track(ResourceType::Texture),
                tracker.track(ResourceType::Texture),
            ],
        }
    }

    fn destroy(self) {
        self.color.destroy();
        self.depth.destroy();
    }
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    _tracked: TrackedResource,
}

impl GpuBuffer {
    fn destroy(self) {
        self.buffer.destroy();
    }
}

/// Instance buffer for one batch, grown on demand
struct InstanceBuffer {
    gpu: GpuBuffer,
    capacity: usize,
    count: u32,
}

struct GpuResources {
    targets: RenderTargets,
    box_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniforms: GpuBuffer,
    bind_group: wgpu::BindGroup,
    box_vertices: GpuBuffer,
    box_indices: GpuBuffer,
    box_index_count: u32,
    floor: Option<(GpuBuffer, u32)>,
    instances: HashMap<BatchKind, InstanceBuffer>,
    _tracked_pipelines: [TrackedResource; 2],
}

impl GpuResources {
    fn destroy(self) {
        self.targets.destroy();
        self.uniforms.destroy();
        self.box_vertices.destroy();
        self.box_indices.destroy();
        if let Some((floor, _)) = self.floor {
            floor.destroy();
        }
        for (_, instances) in self.instances {
            instances.gpu.destroy();
        }
    }
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    tracker: Arc<ResourceTracker>,
    surface: SurfaceId,
    size: (u32, u32),
    lighting: Lighting,
    resources: Option<GpuResources>,
}

impl WgpuBackend {
    fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        tracker: Arc<ResourceTracker>,
        surface: SurfaceId,
        viewport: Viewport,
    ) -> Result<Self> {
        let size = checked_size(&device, viewport)?;
        let resources = Self::create_resources(&device, &tracker, size);
        log::debug!("Created wgpu backend {surface} at {}x{}", size.0, size.1);

        Ok(Self {
            device,
            queue,
            tracker,
            surface,
            size,
            lighting: Lighting::default(),
            resources: Some(resources),
        })
    }

    fn create_resources(device: &wgpu::Device, tracker: &Arc<ResourceTracker>, size: (u32, u32)) -> GpuResources {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Maze Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let depth_stencil = || {
            Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            })
        };
        let color_targets = [Some(wgpu::ColorTargetState {
            format: COLOR_FORMAT,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let box_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Instanced Box Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<BoxVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                    },
                    InstanceRaw::layout(),
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: Default::default(),
                targets: &color_targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: depth_stencil(),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Floor Line Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_grid",
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_grid",
                compilation_options: Default::default(),
                targets: &color_targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: depth_stencil(),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let (vertices, indices) = box_mesh();
        let box_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Box Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let box_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Box Indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        GpuResources {
            targets: RenderTargets::new(device, tracker, size),
            box_pipeline,
            line_pipeline,
            uniforms: GpuBuffer {
                buffer: uniform_buffer,
                _tracked: tracker.track(ResourceType::Buffer),
            },
            bind_group,
            box_vertices: GpuBuffer {
                buffer: box_vertices,
                _tracked: tracker.track(ResourceType::Buffer),
            },
            box_indices: GpuBuffer {
                buffer: box_indices,
                _tracked: tracker.track(ResourceType::Buffer),
            },
            box_index_count: indices.len() as u32,
            floor: None,
            instances: HashMap::new(),
            _tracked_pipelines: [
                tracker.track(ResourceType::Pipeline),
                tracker.track(ResourceType::Pipeline),
            ],
        }
    }

    /// Read the last rendered frame as tightly packed sRGB RGBA8 rows.
    pub async fn read_rgba(&self) -> Result<Vec<u8>> {
        let resources = self.resources.as_ref().ok_or(SceneError::SurfaceReleased)?;
        let (width, height) = self.size;
        let padded_bpr = padded_bytes_per_row(width, 4);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Readback"),
            size: (padded_bpr * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let _tracked = self.tracker.track(ResourceType::Buffer);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &resources.targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        map_read_with_timeout(&self.device, slice, READBACK_TIMEOUT).await?;

        let padded = slice.get_mapped_range();
        let rgba = unpad_rows(&padded, width, height, 4);
        drop(padded);
        staging.unmap();
        staging.destroy();

        Ok(rgba)
    }

    /// Read the last rendered frame and encode it as PNG.
    pub async fn encode_png(&self) -> Result<Vec<u8>> {
        let (width, height) = self.size;
        let rgba = self.read_rgba().await?;
        let img = ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).ok_or_else(|| {
            SceneError::BufferError {
                message: format!("Readback does not fill a {width}x{height} image"),
            }
        })?;

        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

fn checked_size(device: &wgpu::Device, viewport: Viewport) -> Result<(u32, u32)> {
    let (width, height) = viewport.physical_size();
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(SceneError::SurfaceUnavailable {
            reason: format!("{width}x{height} exceeds the GPU texture limit of {max}"),
        });
    }
    Ok((width, height))
}

impl RenderBackend for WgpuBackend {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, viewport: Viewport) -> Result<()> {
        let size = checked_size(&self.device, viewport)?;
        let Some(resources) = self.resources.as_mut() else {
            return Err(SceneError::SurfaceReleased);
        };
        if size == self.size {
            return Ok(());
        }
        let targets = RenderTargets::new(&self.device, &self.tracker, size);
        std::mem::replace(&mut resources.targets, targets).destroy();
        self.size = size;
        Ok(())
    }

    fn set_lighting(&mut self, lighting: &Lighting) -> Result<()> {
        if self.is_disposed() {
            return Err(SceneError::SurfaceReleased);
        }
        self.lighting = *lighting;
        Ok(())
    }

    fn set_floor(&mut self, floor: &FloorGrid) -> Result<()> {
        let Some(resources) = self.resources.as_mut() else {
            return Err(SceneError::SurfaceReleased);
        };
        let vertices = floor_vertices(floor);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Floor Lines"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let gpu = GpuBuffer {
            buffer,
            _tracked: self.tracker.track(ResourceType::Buffer),
        };
        if let Some((old, _)) = resources.floor.replace((gpu, vertices.len() as u32)) {
            old.destroy();
        }
        Ok(())
    }

    fn upload_instances(&mut self, batch: &InstanceBatch) -> Result<()> {
        let Some(resources) = self.resources.as_mut() else {
            return Err(SceneError::SurfaceReleased);
        };
        let kind = batch.kind();
        let raw = batch.to_raw();

        let needs_growth = resources
            .instances
            .get(&kind)
            .map_or(true, |b| b.capacity < raw.len());
        if needs_growth {
            let capacity = raw.len().max(1).next_power_of_two();
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{kind} instances")),
                size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let grown = InstanceBuffer {
                gpu: GpuBuffer {
                    buffer,
                    _tracked: self.tracker.track(ResourceType::Buffer),
                },
                capacity,
                count: 0,
            };
            if let Some(old) = resources.instances.insert(kind, grown) {
                old.gpu.destroy();
            }
            log::debug!("Allocated {kind} buffer for {capacity} instances");
        }

        if let Some(instances) = resources.instances.get_mut(&kind) {
            if !raw.is_empty() {
                self.queue.write_buffer(&instances.gpu.buffer, 0, bytemuck::cast_slice(&raw));
            }
            instances.count = raw.len() as u32;
        }
        Ok(())
    }

    fn render(&mut self, camera: &Camera) -> Result<()> {
        let uniforms = SceneUniforms::new(camera, &self.lighting);
        let resources = self.resources.as_ref().ok_or(SceneError::SurfaceReleased)?;
        self.queue.write_buffer(&resources.uniforms.buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Maze Frame Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Maze Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &resources.targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &resources.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &resources.bind_group, &[]);

            if let Some((floor, count)) = &resources.floor {
                pass.set_pipeline(&resources.line_pipeline);
                pass.set_vertex_buffer(0, floor.buffer.slice(..));
                pass.draw(0..*count, 0..1);
            }

            pass.set_pipeline(&resources.box_pipeline);
            pass.set_vertex_buffer(0, resources.box_vertices.buffer.slice(..));
            pass.set_index_buffer(resources.box_indices.buffer.slice(..), wgpu::IndexFormat::Uint16);
            for kind in [BatchKind::Walls, BatchKind::PathMarkers] {
                let Some(instances) = resources.instances.get(&kind) else {
                    continue;
                };
                if instances.count == 0 {
                    continue;
                }
                pass.set_vertex_buffer(1, instances.gpu.buffer.slice(..));
                pass.draw_indexed(0..resources.box_index_count, 0, 0..instances.count);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn dispose(&mut self) {
        let Some(resources) = self.resources.take() else {
            return;
        };
        resources.destroy();
        self.device.poll(wgpu::Maintain::Poll);
        log::debug!(
            "Disposed wgpu backend {}; {} GPU resources still tracked",
            self.surface,
            self.tracker.total_active()
        );
    }

    fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}
