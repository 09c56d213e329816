//! `wgpu` implementation of [`BufferDevice`]
//!
//! Resources are plain `wgpu::Buffer`s created with a fixed usage set;
//! ranged writes go through `Queue::write_buffer`. Binding slots are collected
//! here and turned into a bind group on demand. `wgpu` has no per-field
//! program state, so there is no [`ProgramDevice`](super::ProgramDevice) here.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry,
    BindingType, BufferBindingType, ShaderStages,
};

use super::{BufferDevice, DeviceHandle};
use crate::error::{device_error, MirrorErrorContext, MirrorResult};
use crate::layout::align_size;

/// Buffer usage sets for mirrored resources
pub mod usage {
    use wgpu::BufferUsages;

    /// Uniform blocks (std140 tables)
    pub const UNIFORM: BufferUsages = BufferUsages::UNIFORM.union(BufferUsages::COPY_DST);

    /// Storage blocks (std430 tables, sequence buffers read by compute)
    pub const STORAGE: BufferUsages = BufferUsages::STORAGE.union(BufferUsages::COPY_DST);

    /// Per-instance vertex data that is also readable from compute
    pub const INSTANCE: BufferUsages = BufferUsages::VERTEX
        .union(BufferUsages::STORAGE)
        .union(BufferUsages::COPY_DST);
}

#[derive(Default)]
struct WgpuState {
    next_handle: u64,
    buffers: FxHashMap<DeviceHandle, wgpu::Buffer>,
    bindings: BTreeMap<u32, DeviceHandle>,
}

/// Buffer device backed by a `wgpu` device and queue
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    usage: wgpu::BufferUsages,
    label: String,
    state: Mutex<WgpuState>,
}

impl WgpuDevice {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        usage: wgpu::BufferUsages,
        label: impl Into<String>,
    ) -> Self {
        Self {
            device,
            queue,
            usage,
            label: label.into(),
            state: Mutex::new(WgpuState::default()),
        }
    }

    /// Run `f` with the `wgpu::Buffer` behind `handle`
    pub fn with_buffer<R>(&self, handle: DeviceHandle, f: impl FnOnce(&wgpu::Buffer) -> R) -> Option<R> {
        let state = self.state.lock();
        state.buffers.get(&handle).map(f)
    }

    /// Layout entries matching the currently bound slots
    pub fn bind_group_layout_entries(&self, visibility: ShaderStages) -> Vec<BindGroupLayoutEntry> {
        let ty = if self.usage.contains(wgpu::BufferUsages::UNIFORM) {
            BufferBindingType::Uniform
        } else {
            BufferBindingType::Storage { read_only: true }
        };

        self.state
            .lock()
            .bindings
            .keys()
            .map(|&binding| BindGroupLayoutEntry {
                binding,
                visibility,
                ty: BindingType::Buffer {
                    ty,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect()
    }

    /// Build a bind group from every bound slot
    pub fn create_bind_group(&self, layout: &BindGroupLayout, label: Option<&str>) -> BindGroup {
        let state = self.state.lock();
        let entries: Vec<BindGroupEntry> = state
            .bindings
            .iter()
            .filter_map(|(&binding, handle)| {
                state.buffers.get(handle).map(|buffer| BindGroupEntry {
                    binding,
                    resource: buffer.as_entire_binding(),
                })
            })
            .collect();

        log::debug!(
            "[WgpuDevice] Creating bind group '{}' with {} entries",
            label.unwrap_or(&self.label),
            entries.len()
        );

        self.device.create_bind_group(&BindGroupDescriptor {
            label,
            layout,
            entries: &entries,
        })
    }
}

impl BufferDevice for WgpuDevice {
    fn allocate(&self, size: u64) -> MirrorResult<DeviceHandle> {
        let size = align_size(size.max(wgpu::COPY_BUFFER_ALIGNMENT), wgpu::COPY_BUFFER_ALIGNMENT);
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(device_error(
                "allocate",
                format!("{} bytes exceeds device limit of {}", size, max),
            ));
        }

        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = DeviceHandle(state.next_handle);

        log::debug!(
            "[WgpuDevice] Creating {} for '{}' ({} bytes)",
            handle,
            self.label,
            size
        );

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} {}", self.label, handle)),
            size,
            usage: self.usage,
            mapped_at_creation: false,
        });
        state.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn write_range(&self, handle: DeviceHandle, offset: u64, bytes: &[u8]) -> MirrorResult<()> {
        let len = u64::try_from(bytes.len()).mirror_context("write_range length")?;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(device_error(
                "write_range",
                format!(
                    "offset {} / length {} not aligned to {} bytes",
                    offset,
                    len,
                    wgpu::COPY_BUFFER_ALIGNMENT
                ),
            ));
        }

        let state = self.state.lock();
        let buffer = state
            .buffers
            .get(&handle)
            .ok_or_else(|| device_error("write_range", format!("unknown {}", handle)))?;
        if offset + len > buffer.size() {
            return Err(device_error(
                "write_range",
                format!("{}+{} exceeds {} bytes of {}", offset, len, buffer.size(), handle),
            ));
        }

        self.queue.write_buffer(buffer, offset, bytes);
        Ok(())
    }

    fn bind_slot(&self, handle: DeviceHandle, slot: u32) -> MirrorResult<()> {
        let mut state = self.state.lock();
        if !state.buffers.contains_key(&handle) {
            return Err(device_error("bind_slot", format!("unknown {}", handle)));
        }
        state.bindings.insert(slot, handle);
        Ok(())
    }

    fn release(&self, handle: DeviceHandle) {
        let mut state = self.state.lock();
        state.bindings.retain(|_, bound| *bound != handle);
        match state.buffers.remove(&handle) {
            Some(buffer) => buffer.destroy(),
            None => log::warn!("[WgpuDevice] Release of unknown {}", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::usage;
    use wgpu::BufferUsages;

    #[test]
    fn test_usage_sets_accept_queue_writes() {
        for set in [usage::UNIFORM, usage::STORAGE, usage::INSTANCE] {
            assert!(set.contains(BufferUsages::COPY_DST));
        }
        assert!(usage::INSTANCE.contains(BufferUsages::VERTEX));
        assert!(!usage::STORAGE.contains(BufferUsages::UNIFORM));
    }
}
