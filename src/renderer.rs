// renderer.rs - draws the current geometry set textured with the latest frame
//
// All meshes share one vertex and one index buffer. Each draw gets its own slot
// in a uniform buffer addressed with a dynamic offset.

use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Mat4;
use image::RgbaImage;
use wgpu::util::DeviceExt;
use winit::window::Window;

use ybvr_viewer::layout::{Rect, MAX_THUMBNAILS};
use ybvr_viewer::{FrameOutput, GeometrySet, Vertex};

/// Geometry sets never hold more than seven meshes; the rest is thumbnail overlay.
const MAX_DRAWS: usize = 8 + MAX_THUMBNAILS;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2];

/// Unit quad appended after the scene meshes, used for thumbnails.
const OVERLAY_VERTICES: [Vertex; 4] = [
    Vertex { position: [-1.0, -1.0, 0.0, 1.0], uv: [0.0, 1.0] },
    Vertex { position: [1.0, -1.0, 0.0, 1.0], uv: [1.0, 1.0] },
    Vertex { position: [-1.0, 1.0, 0.0, 1.0], uv: [0.0, 0.0] },
    Vertex { position: [1.0, 1.0, 0.0, 1.0], uv: [1.0, 0.0] },
];
const OVERLAY_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
    /// Sub-rectangle of the frame sampled by this draw: `[u, v, width, height]`.
    uv_rect: [f32; 4],
    /// x: 1 draws the solid colour instead of the frame.
    flags: [u32; 4],
}

impl DrawUniform {
    fn new(mvp: Mat4, color: [f32; 4], uv_rect: [f32; 4], solid: bool) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
            color,
            uv_rect,
            flags: [solid as u32, 0, 0, 0],
        }
    }
}

const FULL_FRAME: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

struct SceneBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    overlay_vertex_offset: i32,
    overlay_index_offset: u32,
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,

    texture_bind_group_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    frame_size: (u32, u32),

    uniform_buffer: wgpu::Buffer,
    uniform_stride: u64,
    draw_bind_group: wgpu::BindGroup,

    scene: Option<SceneBuffers>,
    pub debug_colors: bool,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .context("creating window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await
            .context("requesting GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // 1x1 black until the first frame arrives
        let texture = create_frame_texture(&device, 1, 1);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        // atlases pack several views side by side, so never wrap
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
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
                ],
                label: Some("frame_bind_group_layout"),
            });
        let frame_bind_group =
            create_frame_bind_group(&device, &texture_bind_group_layout, &texture, &sampler);

        let uniform_size = std::mem::size_of::<DrawUniform>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: uniform_stride * MAX_DRAWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(uniform_size),
                    },
                    count: None,
                }],
                label: Some("draw_bind_group_layout"),
            });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &draw_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniform_size),
                }),
            }],
            label: Some("draw_bind_group"),
        });

        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&texture_bind_group_layout, &draw_bind_group_layout],
            push_constant_ranges: &[],
        });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // the viewer sits inside the sphere, cube and dome
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        log::info!(
            "renderer ready: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            texture_bind_group_layout,
            frame_bind_group,
            texture,
            sampler,
            frame_size: (1, 1),
            uniform_buffer,
            uniform_stride,
            draw_bind_group,
            scene: None,
            debug_colors: false,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Size of the frame currently bound, after any downscale.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// Uploads the concatenated buffers of `set`. Call again whenever the set changes.
    pub fn upload_scene(&mut self, set: &GeometrySet) {
        let mut vertices = set.vertices().to_vec();
        let mut indices = set.indices().to_vec();
        let overlay_vertex_offset = vertices.len() as i32;
        let overlay_index_offset = indices.len() as u32;
        vertices.extend_from_slice(&OVERLAY_VERTICES);
        indices.extend_from_slice(&OVERLAY_INDICES);

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::debug!(
            "uploaded {} meshes: {} vertices, {} indices",
            set.draws().len(),
            vertices.len(),
            indices.len()
        );
        self.scene = Some(SceneBuffers {
            vertex_buffer,
            index_buffer,
            overlay_vertex_offset,
            overlay_index_offset,
        });
    }

    pub fn load_frame(&mut self, img: RgbaImage) {
        let max_texture_dimension = self.device.limits().max_texture_dimension_2d;
        let (src_w, src_h) = img.dimensions();

        let img = if src_w > max_texture_dimension || src_h > max_texture_dimension {
            let scale = (max_texture_dimension as f32 / src_w.max(src_h) as f32).min(1.0);
            let new_w = (src_w as f32 * scale) as u32;
            let new_h = (src_h as f32 * scale) as u32;
            log::warn!(
                "frame {src_w}x{src_h} exceeds the GPU limit of {max_texture_dimension}, scaled to {new_w}x{new_h}"
            );
            image::DynamicImage::ImageRgba8(img)
                .resize(new_w, new_h, image::imageops::FilterType::Lanczos3)
                .to_rgba8()
        } else {
            img
        };

        let (width, height) = img.dimensions();
        self.texture = create_frame_texture(&self.device, width, height);
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &img,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.frame_bind_group = create_frame_bind_group(
            &self.device,
            &self.texture_bind_group_layout,
            &self.texture,
            &self.sampler,
        );
        self.frame_size = (width, height);
    }

    /// Draws one frame. `thumbnails` are frame crops shown as a strip along the
    /// bottom edge of the window.
    pub fn render(
        &mut self,
        set: &GeometrySet,
        frame: &FrameOutput,
        thumbnails: &[Rect],
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut uniforms: Vec<DrawUniform> = Vec::with_capacity(MAX_DRAWS);
        if frame.visible {
            for (draw, mvp) in set.draws().iter().zip(&frame.mvps) {
                uniforms.push(DrawUniform::new(*mvp, draw.color, FULL_FRAME, self.debug_colors));
            }
        }
        let scene_draws = uniforms.len();
        let thumbnail_count = thumbnails.len().min(MAX_DRAWS - scene_draws);
        for (slot, rect) in thumbnails.iter().take(thumbnail_count).enumerate() {
            uniforms.push(DrawUniform::new(
                thumbnail_placement(slot),
                [1.0; 4],
                rect.to_array(),
                false,
            ));
        }
        for (slot, uniform) in uniforms.iter().enumerate() {
            self.queue.write_buffer(
                &self.uniform_buffer,
                slot as u64 * self.uniform_stride,
                bytemuck::cast_slice(&[*uniform]),
            );
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            if let Some(buffers) = &self.scene {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for (slot, draw) in set.draws().iter().take(scene_draws).enumerate() {
                    let offset = (slot as u64 * self.uniform_stride) as u32;
                    render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
                    let start = draw.index_offset;
                    render_pass.draw_indexed(
                        start..start + draw.index_count,
                        draw.vertex_offset as i32,
                        0..1,
                    );
                }

                let start = buffers.overlay_index_offset;
                for slot in scene_draws..scene_draws + thumbnail_count {
                    let offset = (slot as u64 * self.uniform_stride) as u32;
                    render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
                    render_pass.draw_indexed(
                        start..start + OVERLAY_INDICES.len() as u32,
                        buffers.overlay_vertex_offset,
                        0..1,
                    );
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Clip-space transform of thumbnail `slot` in the bottom strip.
fn thumbnail_placement(slot: usize) -> Mat4 {
    let cell = 2.0 / MAX_THUMBNAILS as f32;
    let half_width = cell * 0.45;
    let half_height = half_width * (264.0 / 468.0);
    let x = -1.0 + cell * (slot as f32 + 0.5);
    let y = -1.0 + half_height + 0.02;
    Mat4::from_translation(glam::Vec3::new(x, y, 0.0))
        * Mat4::from_scale(glam::Vec3::new(half_width, half_height, 1.0))
}

fn create_frame_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some("frame_texture"),
        view_formats: &[],
    })
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("frame_bind_group"),
    })
}
