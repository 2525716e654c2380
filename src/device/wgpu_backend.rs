//! wgpu implementation of [`ScanDevice`].
//!
//! The scan kernels are WGSL compute shaders. Each `enqueue` updates a small
//! uniform with the round parameters and submits one compute pass, so rounds
//! execute in submission order. Reads go through a `MAP_READ` staging buffer
//! and block on `device.poll`.
//!
//! Shader compilation and pipeline creation run inside a validation error
//! scope so a broken kernel surfaces its diagnostics as [`Error::Build`]
//! instead of hitting the uncaptured-error handler.

use bytemuck::{Pod, Zeroable};

use super::{BackendKind, ComputeLimits, DeviceInfo, KernelArgs, ScanDevice, ScanKernel, KERNEL_ENTRY_POINTS};
use crate::error::{Error, Result};

/// Must match `@workgroup_size` in the kernel source.
const WORKGROUP_SIZE: u32 = 256;

// ──────────────────────────────────────────────────────────────────────────────
// GPU-side data structures (must match WGSL structs exactly)
// ──────────────────────────────────────────────────────────────────────────────

/// Per-round uniform (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuRoundParams {
    /// Tree level of the round
    depth: u32,
    /// Gap extension, never positive
    decay: i32,
    /// Active work items
    count: u32,
    /// Padding to 16 bytes
    pad:   u32,
}

/// A row buffer on the GPU plus everything needed to use it.
pub struct WgpuBuffer {
    storage:      wgpu::Buffer,
    staging:      wgpu::Buffer,
    upsweep_bg:   wgpu::BindGroup,
    downsweep_bg: wgpu::BindGroup,
    len:          usize,
}

/// Adapter, device, queue and the compiled scan pipelines.
pub struct WgpuDevice {
    device:         wgpu::Device,
    queue:          wgpu::Queue,
    info:           DeviceInfo,
    upsweep:        wgpu::ComputePipeline,
    downsweep:      wgpu::ComputePipeline,
    params:         wgpu::Buffer,
    max_wg_per_dim: u32,
}

// ──────────────────────────────────────────────────────────────────────────────
// Device discovery
// ──────────────────────────────────────────────────────────────────────────────

fn describe(adapter: &wgpu::Adapter) -> DeviceInfo {
    let info = adapter.get_info();
    let limits = adapter.limits();
    let max_bytes = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    DeviceInfo {
        name:           info.name,
        kind:           BackendKind::Wgpu,
        driver:         format!("{:?} {:?} {} {}", info.backend, info.device_type, info.driver, info.driver_info)
                            .trim()
                            .to_owned(),
        max_buffer_len: (max_bytes / 4) as usize,
        limits:         Some(ComputeLimits {
            workgroup_size_x:          limits.max_compute_workgroup_size_x,
            invocations_per_workgroup: limits.max_compute_invocations_per_workgroup,
            workgroups_per_dimension:  limits.max_compute_workgroups_per_dimension,
            buffer_bytes:              limits.max_buffer_size,
        }),
    }
}

/// Every adapter wgpu can see, for the `devices` listing.
pub fn list_adapters() -> Result<Vec<DeviceInfo>> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapters = instance.enumerate_adapters(wgpu::Backends::all());
    if adapters.is_empty() {
        return Err(Error::NoDevice("wgpu found no adapters".to_owned()));
    }
    Ok(adapters.iter().map(describe).collect())
}

// ──────────────────────────────────────────────────────────────────────────────
// Kernel build
// ──────────────────────────────────────────────────────────────────────────────

fn build_pipelines(device: &wgpu::Device, source: &str) -> Result<(wgpu::ComputePipeline, wgpu::ComputePipeline)> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label:  Some("max_decay_scan"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let cp = |ep: &str| {
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label:               Some(ep),
            layout:              None,
            module:              &module,
            entry_point:         Some(ep),
            compilation_options: Default::default(),
            cache:               Default::default(),
        })
    };
    let upsweep = cp(KERNEL_ENTRY_POINTS[0]);
    let downsweep = cp(KERNEL_ENTRY_POINTS[1]);

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        let info = pollster::block_on(module.get_compilation_info());
        let mut log = String::new();
        for msg in info.messages {
            let at = msg
                .location
                .map(|l| format!("{}:{}: ", l.line_number, l.line_position))
                .unwrap_or_default();
            log.push_str(&format!("{:?}: {}{}\n", msg.message_type, at, msg.message));
        }
        log.push_str(&err.to_string());
        return Err(Error::Build { log });
    }

    Ok((upsweep, downsweep))
}

impl WgpuDevice {
    /// Open the highest performance adapter and build `source`.
    pub fn new(source: &str) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))
        .map_err(|e| Error::NoDevice(e.to_string()))?;

        let info = describe(&adapter);
        let limits = adapter.limits();

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label:           Some("swscan_gpu"),
            required_limits: limits.clone(),
            ..Default::default()
        }))
        .map_err(|e| Error::Device { op: "request device", message: e.to_string() })?;

        log::info!("GPU: {}", info);

        let (upsweep, downsweep) = build_pipelines(&device, source)?;

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label:              Some("round_params"),
            size:               std::mem::size_of::<GpuRoundParams>() as u64,
            usage:              wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            info,
            upsweep,
            downsweep,
            params,
            max_wg_per_dim: limits.max_compute_workgroups_per_dimension,
        })
    }

    fn bind_group(&self, pipeline: &wgpu::ComputePipeline, storage: &wgpu::Buffer) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label:  None,
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: storage.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: self.params.as_entire_binding() },
            ],
        })
    }

    /// Fold a 1-D workgroup count into an (x, y) grid within device limits.
    fn grid(&self, global: usize) -> Result<(u32, u32)> {
        let groups = (global as u64).div_ceil(WORKGROUP_SIZE as u64);
        let max = self.max_wg_per_dim.max(1) as u64;
        let x = groups.min(max);
        let y = groups.div_ceil(x.max(1));
        if y > max {
            return Err(Error::InvalidUsage(format!("dispatch of {global} items exceeds the device grid")));
        }
        Ok((x as u32, y as u32))
    }

    fn wait(&self, op: &'static str) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| Error::Device { op, message: e.to_string() })
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// ScanDevice
// ──────────────────────────────────────────────────────────────────────────────

impl ScanDevice for WgpuDevice {
    type Buffer = WgpuBuffer;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc(&mut self, len: usize) -> Result<WgpuBuffer> {
        let size = (len.max(1) * std::mem::size_of::<i32>()) as u64;
        let limit = self.info.max_buffer_len as u64 * 4;
        if size > limit {
            return Err(Error::Allocation {
                requested: size,
                limit,
                reason: "exceeds the adapter's storage binding limit".to_owned(),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let storage = self.device.create_buffer(&wgpu::BufferDescriptor {
            label:              Some("padded_row"),
            size,
            usage:              wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label:              Some("row_readback"),
            size,
            usage:              wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Allocation { requested: size, limit, reason: err.to_string() });
        }

        let upsweep_bg = self.bind_group(&self.upsweep, &storage);
        let downsweep_bg = self.bind_group(&self.downsweep, &storage);

        Ok(WgpuBuffer { storage, staging, upsweep_bg, downsweep_bg, len })
    }

    fn write(&mut self, buf: &WgpuBuffer, offset: usize, data: &[i32]) -> Result<()> {
        if offset + data.len() > buf.len {
            return Err(Error::InvalidUsage(format!(
                "write of {} elements at {} into a buffer of {}",
                data.len(),
                offset,
                buf.len
            )));
        }
        if data.is_empty() {
            return Ok(());
        }
        self.queue.write_buffer(&buf.storage, (offset * 4) as u64, bytemuck::cast_slice(data));
        Ok(())
    }

    fn read(&mut self, buf: &WgpuBuffer, out: &mut [i32]) -> Result<()> {
        if out.len() > buf.len {
            return Err(Error::InvalidUsage(format!(
                "read of {} elements from a buffer of {}",
                out.len(),
                buf.len
            )));
        }
        if out.is_empty() {
            return self.finish();
        }
        let size = (out.len() * 4) as u64;

        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(&buf.storage, 0, &buf.staging, 0, size);
        self.queue.submit([enc.finish()]);

        let slice = buf.staging.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.wait("map row for read")?;
        rx.recv()
            .map_err(|e| Error::Device { op: "map row for read", message: e.to_string() })?
            .map_err(|e| Error::Device { op: "map row for read", message: e.to_string() })?;

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&data));
        }
        buf.staging.unmap();
        Ok(())
    }

    fn enqueue(&mut self, kernel: ScanKernel, buf: &WgpuBuffer, args: KernelArgs, global: usize) -> Result<()> {
        let stride = 2usize << args.depth;
        if global * stride > buf.len {
            return Err(Error::InvalidUsage(format!(
                "{} round at depth {} over {} items overruns a buffer of {}",
                kernel.entry_point(),
                args.depth,
                global,
                buf.len
            )));
        }
        if global == 0 {
            return Ok(());
        }
        let (x, y) = self.grid(global)?;

        let params = GpuRoundParams {
            depth: args.depth,
            decay: args.decay,
            count: global as u32,
            pad:   0,
        };
        self.queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&params));

        let (pipeline, bg) = match kernel {
            ScanKernel::Upsweep => (&self.upsweep, &buf.upsweep_bg),
            ScanKernel::Downsweep => (&self.downsweep, &buf.downsweep_bg),
        };
        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let mut pass = enc.begin_compute_pass(&Default::default());
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bg, &[]);
            pass.dispatch_workgroups(x, y, 1);
        }
        self.queue.submit([enc.finish()]);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.wait("finish")
    }
}
