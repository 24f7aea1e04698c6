use crate::camera::CameraBasis;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use futball_common::{Light, Plane, PlaneIndex, Sphere, SphereIndex};
use futball_scene::{BackendError, ComputeBackend, DeviceSelector, RenderRequest};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GpuSphere {
    center: [f32; 3],
    radius: f32,
    color: u32,
    shininess: f32,
    _pad: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GpuPlane {
    point: [f32; 3],
    shininess: f32,
    normal: [f32; 3],
    color: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GpuLight {
    position: [f32; 3],
    intensity: f32,
    color: u32,
    _pad: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Params {
    eye: [f32; 3],
    half_w: f32,
    forward: [f32; 3],
    half_h: f32,
    right: [f32; 3],
    ambient_intensity: f32,
    up: [f32; 3],
    bounce_limit: i32,
    ambient: u32,
    width: u32,
    height: u32,
    sphere_count: u32,
    plane_count: u32,
    light_count: u32,
    _pad: [u32; 2],
}

impl From<&Sphere> for GpuSphere {
    fn from(s: &Sphere) -> Self {
        Self {
            center: s.center.to_array(),
            radius: s.radius,
            color: s.color.0,
            shininess: s.shininess,
            _pad: [0; 2],
        }
    }
}

impl From<&Plane> for GpuPlane {
    fn from(p: &Plane) -> Self {
        Self {
            point: p.point.to_array(),
            shininess: p.shininess,
            normal: p.normal.to_array(),
            color: p.color.0,
        }
    }
}

impl From<&Light> for GpuLight {
    fn from(l: &Light) -> Self {
        Self {
            position: l.position.to_array(),
            intensity: l.intensity,
            color: l.color.0,
            _pad: [0; 3],
        }
    }
}

/// Bytes for a read-only storage binding. Bindings may not be empty, so an
/// empty list uploads one zeroed element; the shader reads counts from the
/// params block instead of the array length.
fn storage_bytes<T: Pod>(items: &[T]) -> Vec<u8> {
    if items.is_empty() {
        bytemuck::bytes_of(&T::zeroed()).to_vec()
    } else {
        bytemuck::cast_slice(items).to_vec()
    }
}

/// Result of waiting on a `map_async` callback.
fn mapping_outcome(
    received: Result<Result<(), wgpu::BufferAsyncError>, std::sync::mpsc::RecvError>,
) -> Result<(), BackendError> {
    match received {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(BackendError::Readback(e.to_string())),
        Err(e) => Err(BackendError::Readback(format!("map callback dropped: {e}"))),
    }
}

/// Immutable GPU-resident scene and the object lists it was built from.
pub struct GpuScene {
    spheres: Vec<GpuSphere>,
    planes: Vec<GpuPlane>,
    lights: Vec<GpuLight>,
    sphere_buffer: wgpu::Buffer,
    plane_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
}

/// Transient render result: the mapped readback buffer and the buffers the
/// dispatch used.
pub struct GpuPixels {
    params: wgpu::Buffer,
    output: wgpu::Buffer,
    readback: wgpu::Buffer,
    len: usize,
}

fn destroy_grid(grid: GpuPixels) {
    grid.readback.destroy();
    grid.output.destroy();
    grid.params.destroy();
}

/// Compute backend running the ray tracer as a WGSL compute shader.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    adapter_name: String,
}

impl WgpuBackend {
    fn select_adapter(selector: &DeviceSelector) -> Result<wgpu::Adapter, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match selector.hint() {
            Some(hint) => {
                let adapters = instance.enumerate_adapters(wgpu::Backends::all());
                for adapter in &adapters {
                    let info = adapter.get_info();
                    tracing::debug!(name = %info.name, backend = ?info.backend, "found adapter");
                }
                adapters
                    .into_iter()
                    .find(|a| selector.matches(&a.get_info().name))
                    .ok_or_else(|| BackendError::NoDevice(format!("no adapter matches {hint:?}")))?
            }
            None => pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            }))
            .ok_or_else(|| BackendError::NoDevice("no adapter available".into()))?,
        };
        Ok(adapter)
    }

    fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    /// Run `f` inside an out-of-memory error scope.
    fn guarded<T>(&self, what: &str, f: impl FnOnce() -> T) -> Result<T, BackendError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let value = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => {
                tracing::error!(%err, what, "gpu allocation failed");
                Err(BackendError::OutOfMemory(format!("{what}: {err}")))
            }
            None => Ok(value),
        }
    }

    fn upload(
        &self,
        spheres: Vec<GpuSphere>,
        planes: Vec<GpuPlane>,
        lights: Vec<GpuLight>,
    ) -> Result<GpuScene, BackendError> {
        let storage = |label: &str, contents: &[u8]| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: wgpu::BufferUsages::STORAGE,
                })
        };
        let (sphere_buffer, plane_buffer, light_buffer) = self.guarded("scene upload", || {
            (
                storage("sphere_buffer", &storage_bytes(&spheres)),
                storage("plane_buffer", &storage_bytes(&planes)),
                storage("light_buffer", &storage_bytes(&lights)),
            )
        })?;
        Ok(GpuScene {
            spheres,
            planes,
            lights,
            sphere_buffer,
            plane_buffer,
            light_buffer,
        })
    }
}

impl ComputeBackend for WgpuBackend {
    type Scene = GpuScene;
    type PixelGrid = GpuPixels;

    fn create(selector: &DeviceSelector) -> Result<Self, BackendError> {
        let adapter = Self::select_adapter(selector)?;
        let info = adapter.get_info();

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("futball_compute_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| BackendError::DeviceRequest(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trace_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::TRACE_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trace_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                Self::storage_entry(1, true),
                Self::storage_entry(2, true),
                Self::storage_entry(3, true),
                Self::storage_entry(4, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trace_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trace_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(shaders::TRACE_ENTRY),
            compilation_options: Default::default(),
            cache: None,
        });

        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            hint = selector.hint().unwrap_or("-"),
            "gpu compute backend ready"
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            adapter_name: info.name,
        })
    }

    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn empty_scene(&self) -> Result<GpuScene, BackendError> {
        self.upload(Vec::new(), Vec::new(), Vec::new())
    }

    fn add_sphere(
        &self,
        scene: &GpuScene,
        sphere: &Sphere,
    ) -> Result<(GpuScene, SphereIndex), BackendError> {
        let mut spheres = scene.spheres.clone();
        let index = SphereIndex(spheres.len() as i32);
        spheres.push(sphere.into());
        let next = self.upload(spheres, scene.planes.clone(), scene.lights.clone())?;
        Ok((next, index))
    }

    fn add_plane(
        &self,
        scene: &GpuScene,
        plane: &Plane,
    ) -> Result<(GpuScene, PlaneIndex), BackendError> {
        let mut planes = scene.planes.clone();
        let index = PlaneIndex(planes.len() as i32);
        planes.push(plane.into());
        let next = self.upload(scene.spheres.clone(), planes, scene.lights.clone())?;
        Ok((next, index))
    }

    fn add_light(&self, scene: &GpuScene, light: &Light) -> Result<GpuScene, BackendError> {
        let mut lights = scene.lights.clone();
        lights.push(light.into());
        self.upload(scene.spheres.clone(), scene.planes.clone(), lights)
    }

    fn set_sphere_radius(
        &self,
        scene: &GpuScene,
        index: SphereIndex,
        radius: f32,
    ) -> Result<GpuScene, BackendError> {
        let mut spheres = scene.spheres.clone();
        spheres[index.0 as usize].radius = radius;
        self.upload(spheres, scene.planes.clone(), scene.lights.clone())
    }

    fn set_sphere_positions(
        &self,
        scene: &GpuScene,
        indices: &[SphereIndex],
        xs: &[f32],
        ys: &[f32],
        zs: &[f32],
    ) -> Result<GpuScene, BackendError> {
        let mut spheres = scene.spheres.clone();
        for (i, index) in indices.iter().enumerate() {
            spheres[index.0 as usize].center = [xs[i], ys[i], zs[i]];
        }
        self.upload(spheres, scene.planes.clone(), scene.lights.clone())
    }

    fn render(&self, scene: &GpuScene, request: &RenderRequest) -> Result<GpuPixels, BackendError> {
        request.validate()?;
        let basis = CameraBasis::from_request(request);
        let params = Params {
            eye: basis.eye.to_array(),
            half_w: basis.half_w,
            forward: basis.forward.to_array(),
            half_h: basis.half_h,
            right: basis.right.to_array(),
            ambient_intensity: request.ambient_intensity,
            up: basis.up.to_array(),
            bounce_limit: request.bounce_limit,
            ambient: request.ambient.0,
            width: request.width as u32,
            height: request.height as u32,
            sphere_count: scene.spheres.len() as u32,
            plane_count: scene.planes.len() as u32,
            light_count: scene.lights.len() as u32,
            _pad: [0; 2],
        };
        let len = request.pixel_count();
        let size = (len * std::mem::size_of::<u32>()) as u64;

        let grid = self.guarded("frame buffers", || GpuPixels {
            params: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("trace_params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            }),
            output: self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("trace_output"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            }),
            readback: self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("trace_readback"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            len,
        })?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trace_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: grid.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scene.sphere_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: scene.plane_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: scene.light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: grid.output.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trace_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("trace_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                params.width.div_ceil(shaders::WORKGROUP_SIZE),
                params.height.div_ceil(shaders::WORKGROUP_SIZE),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&grid.output, 0, &grid.readback, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        // block until the dispatch and the copy are done and the buffer is mapped
        let (tx, rx) = std::sync::mpsc::channel();
        grid.readback
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        match mapping_outcome(rx.recv()) {
            Ok(()) => Ok(grid),
            Err(e) => {
                // never mapped, so destroy without unmapping
                destroy_grid(grid);
                Err(e)
            }
        }
    }

    fn read_pixels(&self, grid: &GpuPixels, out: &mut [u32]) -> Result<(), BackendError> {
        if out.len() != grid.len {
            return Err(BackendError::Readback(format!(
                "grid holds {} pixels, destination {}",
                grid.len,
                out.len()
            )));
        }
        let data = grid.readback.slice(..).get_mapped_range();
        bytemuck::cast_slice_mut::<u32, u8>(out).copy_from_slice(&data);
        Ok(())
    }

    fn release_scene(&self, scene: GpuScene) {
        scene.sphere_buffer.destroy();
        scene.plane_buffer.destroy();
        scene.light_buffer.destroy();
    }

    fn release_pixel_grid(&self, grid: GpuPixels) {
        grid.readback.unmap();
        destroy_grid(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futball_common::Color;
    use glam::Vec3;

    #[test]
    fn gpu_layouts_match_wgsl_strides() {
        assert_eq!(std::mem::size_of::<GpuSphere>(), 32);
        assert_eq!(std::mem::size_of::<GpuPlane>(), 32);
        assert_eq!(std::mem::size_of::<GpuLight>(), 32);
        assert_eq!(std::mem::size_of::<Params>(), 96);
    }

    #[test]
    fn sphere_conversion_keeps_fields() {
        let sphere = Sphere {
            center: Vec3::new(1.0, 2.0, 3.0),
            radius: 50.0,
            color: Color::RED,
            shininess: 0.1,
        };
        let gpu = GpuSphere::from(&sphere);
        assert_eq!(gpu.center, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.radius, 50.0);
        assert_eq!(gpu.color, 0xFF0000);
    }

    #[test]
    fn empty_storage_is_padded_to_one_element() {
        let empty: Vec<GpuLight> = Vec::new();
        assert_eq!(storage_bytes(&empty).len(), 32);
        let one = vec![GpuLight::from(&Light {
            position: Vec3::ZERO,
            color: Color::WHITE,
            intensity: 1.0,
        })];
        assert_eq!(storage_bytes(&one).len(), 32);
    }

    #[test]
    fn unmatched_device_hint_is_no_device() {
        let selector = DeviceSelector::named("futball-no-such-adapter-7f3a");
        assert!(matches!(
            WgpuBackend::create(&selector),
            Err(BackendError::NoDevice(_))
        ));
    }

    #[test]
    fn failed_or_abandoned_mapping_is_a_readback_error() {
        assert!(mapping_outcome(Ok(Ok(()))).is_ok());
        assert!(matches!(
            mapping_outcome(Ok(Err(wgpu::BufferAsyncError))),
            Err(BackendError::Readback(_))
        ));

        let (tx, rx) = std::sync::mpsc::channel::<Result<(), wgpu::BufferAsyncError>>();
        drop(tx);
        assert!(matches!(
            mapping_outcome(rx.recv()),
            Err(BackendError::Readback(msg)) if msg.contains("dropped")
        ));
    }
}
