// main.rs - desktop host: window, input and frame loading around the viewer core

mod renderer;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use glam::DVec2;
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use renderer::Renderer;
use ybvr_viewer::{Controller, Input, Signaling, SignalingVersion, VideoConfig, ViewportChange};

/// Releases later than this after the last cursor move start no inertia.
const FLICK_WINDOW_SECS: f64 = 0.1;
/// Zoom step per wheel line.
const WHEEL_ZOOM_STEP: f64 = 0.1;

#[derive(Parser, Debug)]
#[command(about = "Multi-camera VR video frame viewer", version)]
struct Args {
    /// Signaling JSON describing the cameras and their geometries
    #[arg(long)]
    signaling: Option<PathBuf>,

    /// v2, v3, ns_equirectangular_mono or ns_flat_mono (default: v2 with --signaling, otherwise ns_equirectangular_mono)
    #[arg(long)]
    signaling_version: Option<SignalingVersion>,

    /// Decoded video frame to map onto the geometry
    #[arg(long)]
    frame: Option<PathBuf>,

    /// Camera id to select after startup instead of the first one
    #[arg(long)]
    camera: Option<i32>,

    /// Video config JSON (field of view, buffering, pending camera warning)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show control room and flat streams as-is, without projection
    #[arg(long)]
    passthrough: bool,

    /// Draw each geometry in its solid debug colour
    #[arg(long)]
    debug_colors: bool,
}

impl Args {
    fn version(&self) -> SignalingVersion {
        self.signaling_version.unwrap_or(if self.signaling.is_some() {
            SignalingVersion::V2
        } else {
            SignalingVersion::NsEquirectangularMono
        })
    }
}

/// Drag state in logical points.
#[derive(Default)]
struct DragTracker {
    pressed: bool,
    last_position: Option<PhysicalPosition<f64>>,
    last_move: Option<Instant>,
    velocity: DVec2,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let version = args.version();
    ensure!(
        !version.has_signaling_file() || args.signaling.is_some(),
        "signaling version {version} needs --signaling"
    );

    let config = match &args.config {
        Some(path) => VideoConfig::load(path).context("loading video config")?,
        None => VideoConfig::default(),
    };
    let signaling = match &args.signaling {
        Some(path) if version.has_signaling_file() => Some(
            Signaling::load(path, version == SignalingVersion::V3)
                .with_context(|| format!("loading signaling {}", path.display()))?,
        ),
        _ => None,
    };

    let (mut controller, analytics) =
        Controller::new(config, version, args.passthrough, signaling.as_ref());
    if let Some(id) = args.camera {
        controller
            .select_camera_id(id)
            .with_context(|| format!("selecting camera {id}"))?;
    }
    let thumbnail_count = signaling
        .as_ref()
        .map(|s| s.control_room_cameras().len())
        .unwrap_or(0);

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("YBVR Viewer")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating window")?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()))?;
    renderer.debug_colors = args.debug_colors;
    renderer.upload_scene(controller.scene());

    let (tx, rx): (Sender<RgbaImage>, Receiver<RgbaImage>) = channel();
    let mut frame_path = args.frame.clone();
    if let Some(path) = &frame_path {
        start_load_image(path.clone(), tx.clone());
    }

    let mut drag = DragTracker::default();
    let mut show_thumbnails = false;
    let mut is_fullscreen = false;
    let mut last_frame_time = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        // a decoded frame stands in for the pending camera's stream going live
        if let Ok(rgba) = rx.try_recv() {
            renderer.load_frame(rgba);
            controller.push(Input::VideoReady);
        }

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }

                WindowEvent::Resized(new_size) => {
                    renderer.resize(new_size);
                }

                WindowEvent::KeyboardInput { input, .. } => {
                    if input.state != ElementState::Pressed {
                        return;
                    }
                    match input.virtual_keycode {
                        Some(VirtualKeyCode::R) => controller.push(Input::Recenter),
                        Some(VirtualKeyCode::Tab | VirtualKeyCode::N) => {
                            controller.select_next_camera();
                            // reloading plays the part of the new camera's stream
                            if let Some(path) = &frame_path {
                                start_load_image(path.clone(), tx.clone());
                            }
                        }
                        Some(VirtualKeyCode::T) => show_thumbnails = !show_thumbnails,
                        Some(VirtualKeyCode::C) => renderer.debug_colors = !renderer.debug_colors,
                        Some(VirtualKeyCode::F11) => {
                            is_fullscreen = !is_fullscreen;
                            if is_fullscreen {
                                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                            } else {
                                window.set_fullscreen(None);
                            }
                        }
                        _ => {}
                    }
                }

                WindowEvent::MouseInput { state, button, .. } => {
                    if button != MouseButton::Left {
                        return;
                    }
                    drag.pressed = state == ElementState::Pressed;
                    if drag.pressed {
                        controller.push(Input::StopMovement);
                    } else {
                        let recent = drag
                            .last_move
                            .is_some_and(|t| t.elapsed().as_secs_f64() < FLICK_WINDOW_SECS);
                        let velocity = if recent { drag.velocity } else { DVec2::ZERO };
                        if velocity != DVec2::ZERO {
                            controller.push(Input::DragEnded(velocity));
                        }
                        drag = DragTracker::default();
                    }
                }

                WindowEvent::CursorMoved { position, .. } => {
                    if !drag.pressed {
                        return;
                    }
                    let now = Instant::now();
                    if let Some(last) = drag.last_position {
                        let scale = window.scale_factor();
                        let delta = DVec2::new(position.x - last.x, position.y - last.y) / scale;
                        controller.push(Input::Drag(delta));
                        if let Some(then) = drag.last_move {
                            let dt = now.duration_since(then).as_secs_f64();
                            if dt > 0.0 {
                                drag.velocity = delta / dt;
                            }
                        }
                    }
                    drag.last_position = Some(position);
                    drag.last_move = Some(now);
                }

                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y as f64,
                        MouseScrollDelta::PixelDelta(pos) => pos.y / 20.0,
                    };
                    controller.push(Input::Pinch(1.0 + scroll * WHEEL_ZOOM_STEP));
                    controller.push(Input::PinchEnded);
                }

                WindowEvent::DroppedFile(path) => {
                    start_load_image(path.clone(), tx.clone());
                    frame_path = Some(path);
                }

                _ => {}
            },

            Event::RedrawRequested(_) => {
                let now = Instant::now();
                let dt = now.duration_since(last_frame_time).as_secs_f64();
                last_frame_time = now;

                let frame = controller.frame(dt);
                for change in analytics.try_iter() {
                    log_viewport_change(&change);
                }

                let thumbnails = if show_thumbnails {
                    let (w, h) = renderer.frame_size();
                    controller
                        .scene()
                        .thumbnail_uv_rects(w as f32, h as f32, thumbnail_count)
                } else {
                    Vec::new()
                };

                match renderer.render(controller.scene(), &frame, &thumbnails) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::error!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn log_viewport_change(change: &ViewportChange) {
    match serde_json::to_string(change) {
        Ok(json) => log::info!("viewport change {json}"),
        Err(err) => log::warn!("could not encode viewport change: {err}"),
    }
}

fn decode_image(path: &Path) -> Result<RgbaImage> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .context("guessing image format")?;
    reader.no_limits();
    let img = reader.decode().context("decoding image")?;
    let (w, h) = img.dimensions();
    log::info!("frame loaded: {w}x{h}");
    Ok(img.to_rgba8())
}

fn start_load_image(path: PathBuf, tx: Sender<RgbaImage>) {
    thread::spawn(move || {
        log::info!("loading frame {} in the background", path.display());
        match decode_image(&path) {
            Ok(rgba) => {
                if tx.send(rgba).is_err() {
                    log::warn!("render loop is gone, dropping frame");
                }
            }
            Err(err) => log::error!("{err:#}"),
        }
    });
}
