use std::fmt;

use bytemuck::{Pod, Zeroable};
use riftglass_core::host::{RenderTargetBinding, RenderTargetDesc, TargetHandle};
use riftglass_core::portal::PortalId;
use riftglass_shared::camera::RenderCamera;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

const PORTAL_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const PORTAL_CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

#[derive(Debug)]
pub enum GpuInitError {
    RequestAdapter(wgpu::RequestAdapterError),
    RequestDevice(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestAdapter(err) => write!(f, "failed to request adapter: {err}"),
            Self::RequestDevice(err) => write!(f, "failed to request device: {err}"),
        }
    }
}

impl std::error::Error for GpuInitError {}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct PortalCameraUniform {
    view_proj: [[f32; 4]; 4],
    position: [f32; 4],
}

impl PortalCameraUniform {
    fn from_camera(camera: &RenderCamera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            position: camera.pose.position.extend(1.0).to_array(),
        }
    }
}

struct GpuTarget {
    portal: PortalId,
    _color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    camera_buffer: wgpu::Buffer,
    frames_rendered: u64,
}

/// Offscreen portal targets on a headless wgpu device. Scene geometry is
/// drawn by the host's own passes, which bind the surface bind group.
pub struct GpuTargets {
    device: wgpu::Device,
    queue: wgpu::Queue,
    sampler: wgpu::Sampler,
    surface_bind_group_layout: wgpu::BindGroupLayout,
    targets: FxHashMap<TargetHandle, GpuTarget>,
    surface_bind_groups: FxHashMap<(PortalId, usize), (TargetHandle, wgpu::BindGroup)>,
    content_shaders: FxHashMap<PortalId, String>,
    next_handle: u32,
    frames_rendered: u64,
}

impl GpuTargets {
    pub fn new() -> Result<Self, GpuInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(GpuInitError::RequestAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Riftglass Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(GpuInitError::RequestDevice)?;

        info!("Using GPU adapter: {}", adapter.get_info().name);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Portal Surface Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let surface_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Portal Surface Bind Group Layout"),
                entries: &surface_layout_entries(),
            });

        Ok(Self {
            device,
            queue,
            sampler,
            surface_bind_group_layout,
            targets: FxHashMap::default(),
            surface_bind_groups: FxHashMap::default(),
            content_shaders: FxHashMap::default(),
            next_handle: 0,
            frames_rendered: 0,
        })
    }

    pub fn total_frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

/// Portal image, its sampler, and the render camera uniform written each frame.
fn surface_layout_entries() -> [wgpu::BindGroupLayoutEntry; 3] {
    [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
    ]
}

fn depth_format(depth_bits: u32) -> wgpu::TextureFormat {
    match depth_bits {
        16 => wgpu::TextureFormat::Depth16Unorm,
        32 => wgpu::TextureFormat::Depth32Float,
        _ => wgpu::TextureFormat::Depth24Plus,
    }
}

impl RenderTargetBinding for GpuTargets {
    fn allocate_target(&mut self, portal: PortalId, desc: &RenderTargetDesc) -> TargetHandle {
        self.next_handle += 1;
        let handle = TargetHandle(self.next_handle);
        let size = wgpu::Extent3d {
            width: desc.width.max(1),
            height: desc.height.max(1),
            depth_or_array_layers: 1,
        };

        let color_label = format!("Portal {} Color Texture", portal.raw());
        let color_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&color_label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PORTAL_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_label = format!("Portal {} Depth Texture", portal.raw());
        let depth_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&depth_label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: depth_format(desc.depth_bits),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let buffer_label = format!("Portal {} Camera Buffer", portal.raw());
        let camera_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&buffer_label),
                contents: bytemuck::bytes_of(&PortalCameraUniform::zeroed()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        self.targets.insert(
            handle,
            GpuTarget {
                portal,
                _color_texture: color_texture,
                color_view,
                _depth_texture: depth_texture,
                depth_view,
                camera_buffer,
                frames_rendered: 0,
            },
        );
        debug!(
            "Allocated GPU target {handle:?} ({}x{}) for portal {portal}",
            size.width, size.height
        );
        handle
    }

    fn assign_content_shader(&mut self, portal: PortalId, shader: &str) {
        self.content_shaders.insert(portal, shader.to_string());
    }

    fn render(&mut self, portal: PortalId, target: TargetHandle, camera: &RenderCamera) {
        let Some(gpu_target) = self.targets.get_mut(&target) else {
            warn!("Portal {portal} rendered into unknown target {target:?}");
            return;
        };

        if gpu_target.frames_rendered == 0 {
            debug!(
                "First frame of portal {portal} with content shader {:?}",
                self.content_shaders.get(&portal)
            );
        }
        self.queue.write_buffer(
            &gpu_target.camera_buffer,
            0,
            bytemuck::bytes_of(&PortalCameraUniform::from_camera(camera)),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Portal RTT Encoder"),
            });
        {
            let _render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Portal RTT Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &gpu_target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(PORTAL_CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu_target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        gpu_target.frames_rendered += 1;
        self.frames_rendered += 1;
    }

    fn bind_surface_texture(&mut self, portal: PortalId, target: TargetHandle, material_slot: usize) {
        let key = (portal, material_slot);
        if self
            .surface_bind_groups
            .get(&key)
            .is_some_and(|(bound, _)| *bound == target)
        {
            return;
        }
        let Some(gpu_target) = self.targets.get(&target) else {
            warn!("Portal {portal} bound unknown target {target:?}");
            return;
        };

        let label = format!("Portal {} Surface Bind Group {material_slot}", portal.raw());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: &self.surface_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gpu_target.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: gpu_target.camera_buffer.as_entire_binding(),
                },
            ],
        });
        self.surface_bind_groups.insert(key, (target, bind_group));
    }

    fn release_target(&mut self, portal: PortalId, target: TargetHandle) {
        if let Some(gpu_target) = self.targets.remove(&target) {
            debug_assert_eq!(gpu_target.portal, portal);
            self.surface_bind_groups
                .retain(|_, (bound, _)| *bound != target);
            debug!("Released GPU target {target:?} of portal {portal}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{depth_format, surface_layout_entries};

    #[test]
    fn surface_bind_group_carries_camera_uniform() {
        let entries = surface_layout_entries();
        let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2]);
        assert!(matches!(
            entries[2].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                ..
            }
        ));
        assert!(entries[2].visibility.contains(wgpu::ShaderStages::VERTEX));
    }

    #[test]
    fn depth_bits_select_depth_format() {
        assert_eq!(depth_format(16), wgpu::TextureFormat::Depth16Unorm);
        assert_eq!(depth_format(24), wgpu::TextureFormat::Depth24Plus);
        assert_eq!(depth_format(32), wgpu::TextureFormat::Depth32Float);
    }
}
