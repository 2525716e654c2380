//! Host emulation of the scan kernels.
//!
//! Buffers are plain vectors owned by the device; each dispatch runs one
//! tree round with the work items spread over the rayon pool. Rounds run in
//! call order, which gives the same ordering guarantee as a device queue.
//! Results are bit-identical to the WGSL kernels.

use rayon::prelude::*;

use super::{BackendKind, DeviceInfo, KernelArgs, ScanDevice, ScanKernel};
use crate::error::{Error, Result};
use crate::scan::carry;

/// Handle to a buffer owned by a [`HostDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBuffer(usize);

/// Runs the scan kernels on host threads.
#[derive(Debug)]
pub struct HostDevice {
    info:    DeviceInfo,
    buffers: Vec<Vec<i32>>,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    /// New host device using the current rayon pool.
    pub fn new() -> Self {
        Self {
            info: DeviceInfo {
                name:           format!("host ({} threads)", rayon::current_num_threads()),
                kind:           BackendKind::Host,
                driver:         "rayon".to_owned(),
                max_buffer_len: u32::MAX as usize / 2 + 1,
                limits:         None,
            },
            buffers: Vec::new(),
        }
    }

    fn storage(&self, buf: &HostBuffer) -> Result<&Vec<i32>> {
        self.buffers
            .get(buf.0)
            .ok_or_else(|| Error::InvalidUsage(format!("unknown host buffer {}", buf.0)))
    }

    fn storage_mut(&mut self, buf: &HostBuffer) -> Result<&mut Vec<i32>> {
        self.buffers
            .get_mut(buf.0)
            .ok_or_else(|| Error::InvalidUsage(format!("unknown host buffer {}", buf.0)))
    }
}

impl ScanDevice for HostDevice {
    type Buffer = HostBuffer;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc(&mut self, len: usize) -> Result<HostBuffer> {
        if len > self.info.max_buffer_len {
            return Err(Error::Allocation {
                requested: len as u64 * 4,
                limit:     self.info.max_buffer_len as u64 * 4,
                reason:    "exceeds the kernel index range".to_owned(),
            });
        }
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| Error::Allocation {
            requested: len as u64 * 4,
            limit:     self.info.max_buffer_len as u64 * 4,
            reason:    e.to_string(),
        })?;
        data.resize(len, 0);
        self.buffers.push(data);
        Ok(HostBuffer(self.buffers.len() - 1))
    }

    fn write(&mut self, buf: &HostBuffer, offset: usize, data: &[i32]) -> Result<()> {
        let storage = self.storage_mut(buf)?;
        let end = offset + data.len();
        if end > storage.len() {
            return Err(Error::InvalidUsage(format!(
                "write of {} elements at {} into a buffer of {}",
                data.len(),
                offset,
                storage.len()
            )));
        }
        storage[offset..end].par_iter_mut().zip(data.par_iter()).for_each(|(d, s)| *d = *s);
        Ok(())
    }

    fn read(&mut self, buf: &HostBuffer, out: &mut [i32]) -> Result<()> {
        let storage = self.storage(buf)?;
        if out.len() > storage.len() {
            return Err(Error::InvalidUsage(format!(
                "read of {} elements from a buffer of {}",
                out.len(),
                storage.len()
            )));
        }
        out.par_iter_mut().zip(storage.par_iter()).for_each(|(d, s)| *d = *s);
        Ok(())
    }

    fn enqueue(&mut self, kernel: ScanKernel, buf: &HostBuffer, args: KernelArgs, global: usize) -> Result<()> {
        let storage = self.storage_mut(buf)?;
        let half = 1usize << args.depth;
        let stride = half << 1;
        if global * stride > storage.len() {
            return Err(Error::InvalidUsage(format!(
                "{} round at depth {} over {} items overruns a buffer of {}",
                kernel.entry_point(),
                args.depth,
                global,
                storage.len()
            )));
        }
        let width = half as u64;
        let active = &mut storage[..global * stride];
        match kernel {
            ScanKernel::Upsweep => active.par_chunks_mut(stride).for_each(|node| {
                node[stride - 1] = carry(node[half - 1], args.decay, width, node[stride - 1]);
            }),
            ScanKernel::Downsweep => active.par_chunks_mut(stride).for_each(|node| {
                let left = node[half - 1];
                let prefix = node[stride - 1];
                node[half - 1] = prefix;
                node[stride - 1] = carry(prefix, args.decay, width, left);
            }),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::NEG_INF;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_read_round() {
        let mut dev = HostDevice::new();
        let buf = dev.alloc(4).unwrap();
        dev.write(&buf, 1, &[7, 8]).unwrap();
        let mut out = [0; 4];
        dev.read(&buf, &mut out).unwrap();
        assert_eq!(out, [0, 7, 8, 0]);
    }

    #[test]
    fn test_single_rounds() {
        let mut dev = HostDevice::new();
        let buf = dev.alloc(4).unwrap();
        dev.write(&buf, 0, &[5, 0, 1, 3]).unwrap();

        dev.enqueue(ScanKernel::Upsweep, &buf, KernelArgs { depth: 0, decay: -1 }, 2).unwrap();
        let mut out = [0; 4];
        dev.read(&buf, &mut out).unwrap();
        assert_eq!(out, [5, 4, 1, 3]);

        dev.write(&buf, 3, &[NEG_INF]).unwrap();
        dev.enqueue(ScanKernel::Downsweep, &buf, KernelArgs { depth: 0, decay: -1 }, 2).unwrap();
        dev.finish().unwrap();
        dev.read(&buf, &mut out).unwrap();
        assert_eq!(out, [4, 5, NEG_INF, 1]);
    }

    #[test]
    fn test_out_of_range_calls() {
        let mut dev = HostDevice::new();
        let buf = dev.alloc(4).unwrap();
        assert!(matches!(dev.write(&buf, 3, &[1, 2]), Err(Error::InvalidUsage(_))));
        assert!(matches!(
            dev.enqueue(ScanKernel::Upsweep, &buf, KernelArgs { depth: 1, decay: 0 }, 2),
            Err(Error::InvalidUsage(_))
        ));
        let mut big = [0; 5];
        assert!(matches!(dev.read(&buf, &mut big), Err(Error::InvalidUsage(_))));
        assert!(matches!(dev.read(&HostBuffer(9), &mut [0; 1]), Err(Error::InvalidUsage(_))));
    }
}
