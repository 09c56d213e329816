//! Growable sequence mirrored between a CPU array and a device buffer
//!
//! The CPU mirror, the device resource and the staging stack each keep their
//! own capacity and growth rate. Growing the device side allocates a fresh
//! resource without copying the old contents; the dirty range is pulled back
//! to element 0 instead, so the next flush rewrites every live element.
//!
//! Inserts can be batched: push elements to the stack, then splice the whole
//! stack in with a single [`merge_stack`](GrowableMirroredBuffer::merge_stack).

use std::mem::size_of;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::buffer::config::GrowthConfig;
use crate::constants::growth::{capacity_for, next_capacity};
use crate::device::{BufferDevice, DeviceHandle};
use crate::dirty::{DirtyRange, DirtyTracker};
use crate::error::{MirrorError, MirrorResult};
use crate::stats::SyncStats;

/// Sequence of `T` mirrored to one device resource
pub struct GrowableMirroredBuffer<T: Pod, D: BufferDevice> {
    device: Arc<D>,
    handle: DeviceHandle,
    /// Always `cpu_capacity` long; elements past `len` are stale
    mirror: Vec<T>,
    len: usize,
    device_capacity: usize,
    stack: Vec<T>,
    stack_capacity: usize,
    config: GrowthConfig,
    /// Byte range of the mirror not yet on the device
    dirty: DirtyTracker,
    stats: SyncStats,
}

impl<T: Pod, D: BufferDevice> GrowableMirroredBuffer<T, D> {
    const ELEMENT_SIZE: usize = size_of::<T>();

    /// Empty buffer; the device resource is allocated immediately
    pub fn new(device: Arc<D>, config: GrowthConfig) -> MirrorResult<Self> {
        config.validate()?;
        if Self::ELEMENT_SIZE == 0 {
            return Err(MirrorError::InvalidConfig(
                "zero-sized element type".to_string(),
            ));
        }

        let handle = device.allocate(Self::byte_size(config.device_capacity)?)?;
        let mut stats = SyncStats::default();
        stats.record_allocation();

        log::debug!(
            "[GrowableMirroredBuffer] Created {} ({} x {} bytes)",
            handle,
            config.device_capacity,
            Self::ELEMENT_SIZE
        );

        Ok(Self {
            device,
            handle,
            mirror: vec![T::zeroed(); config.cpu_capacity],
            len: 0,
            device_capacity: config.device_capacity,
            stack: Vec::with_capacity(config.stack_capacity),
            stack_capacity: config.stack_capacity,
            config,
            dirty: DirtyTracker::new(),
            stats,
        })
    }

    pub fn with_defaults(device: Arc<D>) -> MirrorResult<Self> {
        Self::new(device, GrowthConfig::default())
    }

    /// Byte length of `elements` already known to fit in a capacity
    fn byte_len(elements: usize) -> u64 {
        (elements * Self::ELEMENT_SIZE) as u64
    }

    /// Byte length of a new capacity; `InvalidConfig` if it cannot be addressed
    fn byte_size(elements: usize) -> MirrorResult<u64> {
        elements
            .checked_mul(Self::ELEMENT_SIZE)
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .map(|bytes| bytes as u64)
            .ok_or_else(|| capacity_overflow(elements))
    }

    /// Length after adding `extra` elements
    fn required(&self, extra: usize) -> MirrorResult<usize> {
        self.len
            .checked_add(extra)
            .ok_or_else(|| capacity_overflow(extra))
    }

    fn mark_elements(&mut self, start: usize, count: usize) {
        self.dirty
            .mark(Self::byte_len(start), Self::byte_len(count));
    }

    /// Map a signed index into `0..len`; negative indices count from the end
    fn normalize(&self, index: isize) -> MirrorResult<usize> {
        let len = self.len as isize;
        if index >= len || index < -len {
            return Err(MirrorError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok((((index % len) + len) % len) as usize)
    }

    /// Grow each side, at most one reallocation apiece, to hold `required` elements
    ///
    /// Sizes are checked and CPU memory reserved before any state changes.
    fn ensure_capacity(&mut self, required: usize) -> MirrorResult<()> {
        let device_growth = if required > self.device_capacity {
            let capacity =
                capacity_for(self.device_capacity, required, self.config.device_grow_rate)
                    .ok_or_else(|| capacity_overflow(required))?;
            Some((capacity, Self::byte_size(capacity)?))
        } else {
            None
        };

        let cpu_growth = if required > self.mirror.len() {
            let capacity = capacity_for(self.mirror.len(), required, self.config.cpu_grow_rate)
                .ok_or_else(|| capacity_overflow(required))?;
            Self::byte_size(capacity)?;
            self.mirror
                .try_reserve_exact(capacity - self.mirror.len())
                .map_err(|e| {
                    MirrorError::InvalidConfig(format!("CPU mirror of {} elements: {}", capacity, e))
                })?;
            Some(capacity)
        } else {
            None
        };

        if let Some((capacity, size)) = device_growth {
            let handle = self.device.allocate(size)?;

            log::debug!(
                "[GrowableMirroredBuffer] Device {} -> {} elements ({} replaces {})",
                self.device_capacity,
                capacity,
                handle,
                self.handle
            );

            self.device.release(self.handle);
            self.handle = handle;
            self.device_capacity = capacity;
            self.stats.record_allocation();

            // The new resource starts empty: every live element goes up again
            self.mark_elements(0, self.len);
            self.dirty.force_from_start();
        }

        if let Some(capacity) = cpu_growth {
            log::trace!(
                "[GrowableMirroredBuffer] CPU {} -> {} elements",
                self.mirror.len(),
                capacity
            );
            self.mirror.resize(capacity, T::zeroed());
        }

        Ok(())
    }

    /// Append one element at the end
    pub fn append(&mut self, value: T) -> MirrorResult<()> {
        self.ensure_capacity(self.required(1)?)?;
        self.mirror[self.len] = value;
        self.mark_elements(self.len, 1);
        self.len += 1;
        Ok(())
    }

    pub fn push(&mut self, value: T) -> MirrorResult<()> {
        self.append(value)
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> MirrorResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.ensure_capacity(self.required(values.len())?)?;
        self.mirror[self.len..self.len + values.len()].copy_from_slice(values);
        self.mark_elements(self.len, values.len());
        self.len += values.len();
        Ok(())
    }

    /// Reserve room for `amount` more elements without changing the length
    pub fn grow(&mut self, amount: usize) -> MirrorResult<()> {
        let required = self.required(amount)?;
        self.ensure_capacity(required)
    }

    pub fn get(&self, index: isize) -> MirrorResult<T> {
        let index = self.normalize(index)?;
        Ok(self.mirror[index])
    }

    pub fn set(&mut self, index: isize, value: T) -> MirrorResult<()> {
        let index = self.normalize(index)?;
        self.mirror[index] = value;
        self.mark_elements(index, 1);
        Ok(())
    }

    /// Remove `count` elements starting at `start`
    ///
    /// Removing a suffix only shortens the buffer. Anything else shifts the
    /// tail down and marks the shifted region dirty. Capacities are kept.
    pub fn remove(&mut self, start: isize, count: usize) -> MirrorResult<()> {
        let start = self.normalize(start)?;
        if count == 0 {
            return Ok(());
        }

        if count >= self.len - start {
            self.len = start;
        } else {
            self.mirror.copy_within(start + count..self.len, start);
            self.len -= count;
            self.mark_elements(start, self.len - start);
        }

        self.dirty.clamp_to(Self::byte_len(self.len));
        Ok(())
    }

    /// Shorten to `len` elements; a negative `len` drops that many from the end
    pub fn truncate(&mut self, len: isize) -> MirrorResult<()> {
        let new_len = if len < 0 {
            let kept = self.len as isize + len;
            if kept < 0 {
                return Err(MirrorError::IndexOutOfRange {
                    index: len,
                    len: self.len,
                });
            }
            kept as usize
        } else {
            len as usize
        };

        if new_len < self.len {
            self.len = new_len;
            self.dirty.clamp_to(Self::byte_len(self.len));
        }
        Ok(())
    }

    /// Length 0; capacities and the device resource are kept
    pub fn clear(&mut self) {
        self.len = 0;
        self.dirty.clear();
    }

    /// Stage one element for a later [`merge_stack`](Self::merge_stack)
    pub fn push_to_stack(&mut self, value: T) {
        if self.stack.len() == self.stack_capacity {
            self.stack_capacity = next_capacity(self.stack_capacity, self.config.stack_grow_rate)
                .unwrap_or(usize::MAX);
            self.stack
                .reserve_exact(self.stack_capacity - self.stack.len());
        }
        self.stack.push(value);
    }

    /// Splice the staged elements in at `index`, in push order, and empty the stack
    ///
    /// `index` may equal the length, which appends the whole stack.
    pub fn merge_stack(&mut self, index: isize) -> MirrorResult<()> {
        let index = if index == self.len as isize {
            self.len
        } else {
            self.normalize(index)?
        };
        let staged = self.stack.len();
        if staged == 0 {
            return Ok(());
        }

        self.ensure_capacity(self.required(staged)?)?;
        self.mirror.copy_within(index..self.len, index + staged);
        self.mirror[index..index + staged].copy_from_slice(&self.stack);
        self.len += staged;
        self.mark_elements(index, self.len - index);
        self.stack.clear();

        log::trace!(
            "[GrowableMirroredBuffer] Merged {} staged elements at {}",
            staged,
            index
        );
        Ok(())
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Upload the dirty span with one ranged write
    pub fn flush(&mut self) -> MirrorResult<()> {
        self.stats.record_flush();

        let Some(range) = self.dirty.get() else {
            return Ok(());
        };

        let bytes: &[u8] = bytemuck::cast_slice(&self.mirror);
        self.device
            .write_range(self.handle, range.low, &bytes[range.as_range()])?;
        self.stats.record_write(range.len());
        self.dirty.clear();

        log::trace!(
            "[GrowableMirroredBuffer] Flushed bytes {}..={} to {}",
            range.low,
            range.high,
            self.handle
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live elements
    pub fn as_slice(&self) -> &[T] {
        &self.mirror[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn stack_slice(&self) -> &[T] {
        &self.stack
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn cpu_capacity(&self) -> usize {
        self.mirror.len()
    }

    pub fn device_capacity(&self) -> usize {
        self.device_capacity
    }

    pub fn stack_capacity(&self) -> usize {
        self.stack_capacity
    }

    pub fn element_size(&self) -> usize {
        Self::ELEMENT_SIZE
    }

    pub fn dirty_range(&self) -> Option<DirtyRange> {
        self.dirty.get()
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

fn capacity_overflow(elements: usize) -> MirrorError {
    MirrorError::InvalidConfig(format!("capacity for {} more elements overflows", elements))
}

impl<T: Pod, D: BufferDevice> Drop for GrowableMirroredBuffer<T, D> {
    fn drop(&mut self) {
        log::debug!("[GrowableMirroredBuffer] Releasing {}", self.handle);
        self.device.release(self.handle);
    }
}
