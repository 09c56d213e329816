//! In-memory device that records every call
//!
//! Keeps a byte-exact copy of every live resource and every field set, so the
//! device-side view of a mirror can be inspected without a GPU. Fresh
//! resources are filled with [`RecordingDevice::UNINITIALIZED`] rather than
//! zeros, which makes missing uploads visible.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{BufferDevice, DeviceHandle, Location, ProgramDevice, ProgramHandle};
use crate::error::{device_error, MirrorResult};
use crate::layout::FieldType;

/// One recorded device call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Allocate {
        handle: DeviceHandle,
        size: u64,
    },
    WriteRange {
        handle: DeviceHandle,
        offset: u64,
        len: u64,
    },
    BindSlot {
        handle: DeviceHandle,
        slot: u32,
    },
    Release {
        handle: DeviceHandle,
    },
    SetField {
        location: Location,
        field_type: FieldType,
        count: u32,
        len: u64,
    },
}

/// Last value set at a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpload {
    pub field_type: FieldType,
    pub count: u32,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct RecordingState {
    next_handle: u64,
    next_location: i32,
    buffers: FxHashMap<DeviceHandle, Vec<u8>>,
    bindings: BTreeMap<u32, DeviceHandle>,
    programs: FxHashMap<ProgramHandle, FxHashMap<String, Location>>,
    fields: FxHashMap<Location, FieldUpload>,
    released: Vec<DeviceHandle>,
    calls: Vec<DeviceCall>,
    fail_writes: bool,
}

/// Headless [`BufferDevice`] + [`ProgramDevice`]
#[derive(Default)]
pub struct RecordingDevice {
    state: Mutex<RecordingState>,
}

impl RecordingDevice {
    /// Fill byte of freshly allocated resources
    pub const UNINITIALIZED: u8 = 0xCD;

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program exposing `field_names`; each gets a fresh location
    pub fn add_program(&self, field_names: &[&str]) -> ProgramHandle {
        let mut state = self.state.lock();
        let program = ProgramHandle(state.programs.len() as u64 + 1);
        let mut locations = FxHashMap::default();
        for name in field_names {
            locations.insert(name.to_string(), Location(state.next_location));
            state.next_location += 1;
        }
        state.programs.insert(program, locations);
        program
    }

    /// Make every following write (ranged or per-field) fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Current device-side bytes of a live resource
    pub fn contents(&self, handle: DeviceHandle) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&handle).cloned()
    }

    pub fn binding(&self, slot: u32) -> Option<DeviceHandle> {
        self.state.lock().bindings.get(&slot).copied()
    }

    /// Last upload at the location `name` resolves to in `program`
    pub fn field_value(&self, program: ProgramHandle, name: &str) -> Option<FieldUpload> {
        let state = self.state.lock();
        let location = state.programs.get(&program)?.get(name)?;
        state.fields.get(location).cloned()
    }

    pub fn live_handles(&self) -> Vec<DeviceHandle> {
        let mut handles: Vec<_> = self.state.lock().buffers.keys().copied().collect();
        handles.sort();
        handles
    }

    pub fn released(&self) -> Vec<DeviceHandle> {
        self.state.lock().released.clone()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of ranged writes and field sets recorded
    pub fn write_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::WriteRange { .. } | DeviceCall::SetField { .. }))
            .count()
    }
}

impl BufferDevice for RecordingDevice {
    fn allocate(&self, size: u64) -> MirrorResult<DeviceHandle> {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = DeviceHandle(state.next_handle);
        state
            .buffers
            .insert(handle, vec![Self::UNINITIALIZED; size as usize]);
        state.calls.push(DeviceCall::Allocate { handle, size });
        log::trace!("[RecordingDevice] Allocated {} ({} bytes)", handle, size);
        Ok(handle)
    }

    fn write_range(&self, handle: DeviceHandle, offset: u64, bytes: &[u8]) -> MirrorResult<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(device_error("write_range", "injected failure"));
        }
        let buffer = state
            .buffers
            .get_mut(&handle)
            .ok_or_else(|| device_error("write_range", format!("unknown {}", handle)))?;

        let start = offset as usize;
        let end = start + bytes.len();
        if end > buffer.len() {
            return Err(device_error(
                "write_range",
                format!("{}..{} exceeds {} bytes of {}", start, end, buffer.len(), handle),
            ));
        }
        buffer[start..end].copy_from_slice(bytes);
        state.calls.push(DeviceCall::WriteRange {
            handle,
            offset,
            len: bytes.len() as u64,
        });
        Ok(())
    }

    fn bind_slot(&self, handle: DeviceHandle, slot: u32) -> MirrorResult<()> {
        let mut state = self.state.lock();
        if !state.buffers.contains_key(&handle) {
            return Err(device_error("bind_slot", format!("unknown {}", handle)));
        }
        state.bindings.insert(slot, handle);
        state.calls.push(DeviceCall::BindSlot { handle, slot });
        Ok(())
    }

    fn release(&self, handle: DeviceHandle) {
        let mut state = self.state.lock();
        if state.buffers.remove(&handle).is_none() {
            log::warn!("[RecordingDevice] Release of unknown {}", handle);
        }
        state.bindings.retain(|_, bound| *bound != handle);
        state.released.push(handle);
        state.calls.push(DeviceCall::Release { handle });
    }
}

impl ProgramDevice for RecordingDevice {
    fn resolve_field_location(&self, program: ProgramHandle, name: &str) -> Option<Location> {
        self.state.lock().programs.get(&program)?.get(name).copied()
    }

    fn set_field(
        &self,
        location: Location,
        field_type: FieldType,
        count: u32,
        bytes: &[u8],
    ) -> MirrorResult<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(device_error("set_field", "injected failure"));
        }
        state.fields.insert(
            location,
            FieldUpload {
                field_type,
                count,
                bytes: bytes.to_vec(),
            },
        );
        state.calls.push(DeviceCall::SetField {
            location,
            field_type,
            count,
            len: bytes.len() as u64,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_write_release() {
        let device = RecordingDevice::new();
        let handle = device.allocate(8).unwrap();
        assert_eq!(device.contents(handle), Some(vec![RecordingDevice::UNINITIALIZED; 8]));

        device.write_range(handle, 2, &[1, 2, 3]).unwrap();
        let contents = device.contents(handle).unwrap();
        assert_eq!(&contents[2..5], &[1, 2, 3]);
        assert_eq!(contents[0], RecordingDevice::UNINITIALIZED);

        device.bind_slot(handle, 3).unwrap();
        assert_eq!(device.binding(3), Some(handle));

        device.release(handle);
        assert_eq!(device.contents(handle), None);
        assert_eq!(device.binding(3), None);
        assert_eq!(device.released(), vec![handle]);
    }

    #[test]
    fn test_out_of_bounds_write_fails() {
        let device = RecordingDevice::new();
        let handle = device.allocate(4).unwrap();
        assert!(device.write_range(handle, 2, &[0; 4]).is_err());
        assert!(device.write_range(DeviceHandle(99), 0, &[0]).is_err());
    }

    #[test]
    fn test_programs_resolve_locations() {
        let device = RecordingDevice::new();
        let a = device.add_program(&["color", "scale"]);
        let b = device.add_program(&["scale"]);

        let color = device.resolve_field_location(a, "color").unwrap();
        let scale_a = device.resolve_field_location(a, "scale").unwrap();
        let scale_b = device.resolve_field_location(b, "scale").unwrap();
        assert_ne!(color, scale_a);
        assert_ne!(scale_a, scale_b);
        assert_eq!(device.resolve_field_location(b, "color"), None);

        device
            .set_field(scale_b, FieldType::FLOAT, 1, &2.0f32.to_ne_bytes())
            .unwrap();
        let upload = device.field_value(b, "scale").unwrap();
        assert_eq!(upload.bytes, 2.0f32.to_ne_bytes().to_vec());
        assert!(device.field_value(a, "scale").is_none());
    }

    #[test]
    fn test_injected_failures() {
        let device = RecordingDevice::new();
        let handle = device.allocate(4).unwrap();
        device.set_fail_writes(true);
        assert!(device.write_range(handle, 0, &[0; 4]).is_err());
        assert!(device
            .set_field(Location(0), FieldType::INT, 1, &[0; 4])
            .is_err());
        assert_eq!(device.write_count(), 0);
    }
}
