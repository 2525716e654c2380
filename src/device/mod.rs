//! The narrow boundary between the scan engine and a compute device.
//!
//! The engine only ever needs one read-write buffer of `i32`, host writes
//! and reads of that buffer, and the two tree kernels. [`ScanDevice`] is
//! exactly that surface. [`wgpu_backend::WgpuDevice`] runs the kernels as
//! WGSL compute shaders; [`host::HostDevice`] runs the same kernels on the
//! rayon pool and is what the test-suite uses.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::Result;

pub mod host;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

/// Embedded WGSL source for the `upsweep` and `downsweep` kernels.
pub const SCAN_KERNEL_SOURCE: &str = include_str!("../shaders/max_decay_scan.wgsl");

/// Entry points a kernel source must expose
pub const KERNEL_ENTRY_POINTS: [&str; 2] = ["upsweep", "downsweep"];

/// The two tree kernels of the max-decay scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKernel {
    /// Reduction round: fold each left block into its right sibling
    Upsweep,
    /// Distribution round: push prefixes back down the tree
    Downsweep,
}

impl ScanKernel {
    /// Entry point name in the kernel source
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Upsweep => "upsweep",
            Self::Downsweep => "downsweep",
        }
    }
}

/// Scalar arguments bound next to the buffer for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelArgs {
    /// Tree level of this round; a child block spans `2^depth` elements
    pub depth: u32,
    /// Per-position decay (gap extension), never positive
    pub decay: i32,
}

/// Which implementation of [`ScanDevice`] backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Rayon emulation of the kernels on the host
    Host,
    /// WGSL compute shaders through wgpu
    Wgpu,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Wgpu => write!(f, "wgpu"),
        }
    }
}

/// Human readable description of a device, for logs and the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Adapter or host name
    pub name: String,
    /// Backing implementation
    pub kind: BackendKind,
    /// Graphics API / driver description
    pub driver: String,
    /// Largest buffer, in `i32` elements, a single binding can hold
    pub max_buffer_len: usize,
    /// Dispatch limits of a GPU adapter; `None` on the host
    pub limits: Option<ComputeLimits>,
}

/// The adapter limits that bound a scan dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeLimits {
    /// `max_compute_workgroup_size_x`
    pub workgroup_size_x: u32,
    /// `max_compute_invocations_per_workgroup`
    pub invocations_per_workgroup: u32,
    /// `max_compute_workgroups_per_dimension`
    pub workgroups_per_dimension: u32,
    /// `max_buffer_size`, in bytes
    pub buffer_bytes: u64,
}

impl fmt::Display for ComputeLimits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "workgroup x {}; invocations/workgroup {}; workgroups/dim {}; max buffer {} bytes",
            self.workgroup_size_x, self.invocations_per_workgroup, self.workgroups_per_dimension, self.buffer_bytes,
        )
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}; {}; max binding {} elements",
            self.name, self.kind, self.driver, self.max_buffer_len,
        )?;
        if let Some(limits) = &self.limits {
            write!(f, "; {limits}")?;
        }
        write!(f, "]")
    }
}

/// Allocation, host transfer and kernel dispatch on one device queue.
///
/// Every call can fail; callers stop at the first error.
pub trait ScanDevice {
    /// Handle to a device-resident `i32` buffer
    type Buffer;

    /// Description of the device
    fn info(&self) -> &DeviceInfo;

    /// Allocate a read-write buffer of `len` elements.
    fn alloc(&mut self, len: usize) -> Result<Self::Buffer>;

    /// Write `data` at element `offset`. Visible to every later dispatch.
    fn write(&mut self, buf: &Self::Buffer, offset: usize, data: &[i32]) -> Result<()>;

    /// Copy the first `out.len()` elements back. Blocks until all work
    /// enqueued before it has completed.
    fn read(&mut self, buf: &Self::Buffer, out: &mut [i32]) -> Result<()>;

    /// Launch `kernel` over `global` work items. May return before the
    /// work has run; ordering with later calls on the same device holds.
    fn enqueue(&mut self, kernel: ScanKernel, buf: &Self::Buffer, args: KernelArgs, global: usize) -> Result<()>;

    /// Block until everything enqueued so far has completed.
    fn finish(&mut self) -> Result<()>;
}

/// Kernel source from `path`, or the embedded source when `None`.
pub fn load_kernel_source(path: Option<&Path>) -> Result<Cow<'static, str>> {
    match path {
        Some(p) => {
            log::info!("Loading kernel source from {}", p.display());
            Ok(Cow::Owned(fs::read_to_string(p)?))
        }
        None => Ok(Cow::Borrowed(SCAN_KERNEL_SOURCE)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_source_has_entry_points() {
        let src = load_kernel_source(None).unwrap();
        for ep in KERNEL_ENTRY_POINTS {
            assert!(src.contains(&format!("fn {ep}(")), "missing entry point {ep}");
        }
        assert_eq!(ScanKernel::Upsweep.entry_point(), KERNEL_ENTRY_POINTS[0]);
        assert_eq!(ScanKernel::Downsweep.entry_point(), KERNEL_ENTRY_POINTS[1]);
    }

    #[test]
    fn test_missing_kernel_file_is_io_error() {
        let err = load_kernel_source(Some(Path::new("/nonexistent/scan.wgsl"))).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }

    #[test]
    fn test_device_info_display() {
        let mut info = DeviceInfo {
            name:           "gpu0".to_owned(),
            kind:           BackendKind::Wgpu,
            driver:         "Vulkan".to_owned(),
            max_buffer_len: 1024,
            limits:         None,
        };
        assert_eq!(info.to_string(), "gpu0 [wgpu; Vulkan; max binding 1024 elements]");
        info.limits = Some(ComputeLimits {
            workgroup_size_x:          256,
            invocations_per_workgroup: 256,
            workgroups_per_dimension:  65535,
            buffer_bytes:              4096,
        });
        assert_eq!(
            info.to_string(),
            "gpu0 [wgpu; Vulkan; max binding 1024 elements; workgroup x 256; \
             invocations/workgroup 256; workgroups/dim 65535; max buffer 4096 bytes]"
        );
    }
}
