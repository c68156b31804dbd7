//! Guest Container (C8) — per-guest lifecycle state machine holding loaded
//! images and forwarding syscalls to C3/C4. `spec.md` §3.1/§4.7.

use crate::boot::android;
use crate::boot::linux;
use crate::boot::BootProtocolState;
use crate::error::CoreError;
use crate::kernel_state::SyscallKernelState;
use crate::memory::FlatGuestMemory;
use crate::syscall::{self, SyscallContext};

pub const ANDROID_KERNEL_BASE: u64 = 0x8_0000;
pub const ANDROID_RAMDISK_BASE: u64 = 0x100_0000;
pub const ANDROID_MEMORY_SIZE: u64 = 256 * 1024 * 1024;
pub const ANDROID_SYSTEM_CEILING: u64 = 512 * 1024 * 1024;
pub const ANDROID_DATA_CEILING: u64 = 1024 * 1024 * 1024;

pub const LINUX_KERNEL_BASE: u64 = 0x10_0000;
pub const LINUX_MEMORY_SIZE: u64 = 128 * 1024 * 1024;
pub const LINUX_ROOTFS_CEILING: u64 = 512 * 1024 * 1024;

const CMDLINE_CAP: usize = 512;
const PROPERTY_TABLE_CAP: usize = 64;
const PROPERTY_FIELD_CAP: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Arm32,
    Arm64,
    X86,
    X86_64,
}

impl Arch {
    /// Total over the arch space, per the invariant in §3.1.
    pub fn arch_name(self) -> &'static str {
        match self {
            Arch::Arm32 => "arm32",
            Arch::Arm64 => "arm64",
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestState {
    Uninitialized,
    Initialized,
    Booting,
    Running,
    Paused,
    Stopped,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestKind {
    Android,
    Linux,
}

struct OwnedBuffer {
    bytes: Vec<u8>,
    load_addr: u64,
}

/// Fields common to both guest kinds. `spec.md` §3.1.
pub struct GuestContainer {
    kind: GuestKind,
    state: GuestState,
    arch: Arch,
    kernel: Option<OwnedBuffer>,
    kernel_entry: u64,
    ramdisk: Option<OwnedBuffer>,
    system_partition: Option<OwnedBuffer>,
    data_partition: Option<OwnedBuffer>,
    kernel_cmdline: String,
    version_code: u32,
    dalvik_enabled: bool,
}

impl GuestContainer {
    /// `create(arch)` → `Initialized`.
    pub fn create(kind: GuestKind, arch: Arch) -> Self {
        GuestContainer {
            kind,
            state: GuestState::Initialized,
            arch,
            kernel: None,
            kernel_entry: 0,
            ramdisk: None,
            system_partition: None,
            data_partition: None,
            kernel_cmdline: String::new(),
            version_code: 0,
            dalvik_enabled: false,
        }
    }

    pub fn state(&self) -> GuestState {
        self.state
    }

    pub fn kind(&self) -> GuestKind {
        self.kind
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    fn kernel_base(&self) -> u64 {
        match self.kind {
            GuestKind::Android => ANDROID_KERNEL_BASE,
            GuestKind::Linux => LINUX_KERNEL_BASE,
        }
    }

    fn memory_size(&self) -> u64 {
        match self.kind {
            GuestKind::Android => ANDROID_MEMORY_SIZE,
            GuestKind::Linux => LINUX_MEMORY_SIZE,
        }
    }

    /// Frees the previous kernel buffer (if any), copies `bytes`, and seeds
    /// `kernel_entry` at the platform's fixed `KERNEL_BASE`.
    pub fn load_kernel(
        &mut self,
        guest_memory: &mut FlatGuestMemory,
        boot_state: &mut BootProtocolState,
        bytes: &[u8],
    ) -> Result<(), CoreError> {
        let base = self.kernel_base();
        match self.kind {
            GuestKind::Android => {
                let parsed = android::load_into_guest(
                    guest_memory,
                    boot_state,
                    bytes,
                    base,
                    ANDROID_RAMDISK_BASE,
                )?;
                self.kernel_cmdline = parsed.cmdline.clone();
            }
            GuestKind::Linux => {
                let cmdline = if self.kernel_cmdline.is_empty() { None } else { Some(self.kernel_cmdline.as_str()) };
                linux::load_kernel(guest_memory, boot_state, bytes, base, cmdline)?;
                linux::resize_top_e820(boot_state, self.memory_size());
                self.kernel_cmdline = boot_state.linux_boot.cmdline.clone();
            }
        }
        self.kernel = Some(OwnedBuffer { bytes: bytes.to_vec(), load_addr: base });
        self.kernel_entry = base;
        log::info!("guest[{}]: kernel loaded ({} bytes)", self.kind_name(), bytes.len());
        Ok(())
    }

    pub fn load_ramdisk(
        &mut self,
        guest_memory: &mut FlatGuestMemory,
        boot_state: &mut BootProtocolState,
        bytes: &[u8],
    ) -> Result<(), CoreError> {
        let load_addr = match self.kind {
            GuestKind::Android => ANDROID_RAMDISK_BASE,
            GuestKind::Linux => self.kernel_base() + self.kernel.as_ref().map(|k| k.bytes.len() as u64).unwrap_or(0),
        };
        if guest_memory.write(load_addr, bytes.len(), bytes).is_err() {
            return Err(CoreError::ResourceExhaustion("ramdisk write out of guest bounds"));
        }
        boot_state.set_initrd(load_addr, bytes.len() as u64);
        self.ramdisk = Some(OwnedBuffer { bytes: bytes.to_vec(), load_addr });
        Ok(())
    }

    fn load_bounded_partition(&mut self, bytes: &[u8], ceiling: u64, which: PartitionKind) -> Result<(), CoreError> {
        if bytes.len() as u64 > ceiling {
            return Err(CoreError::ResourceExhaustion("partition exceeds platform ceiling"));
        }
        let buf = OwnedBuffer { bytes: bytes.to_vec(), load_addr: 0 };
        match which {
            PartitionKind::System => self.system_partition = Some(buf),
            PartitionKind::Data => self.data_partition = Some(buf),
        }
        Ok(())
    }

    pub fn load_system(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        let ceiling = match self.kind {
            GuestKind::Android => ANDROID_SYSTEM_CEILING,
            GuestKind::Linux => LINUX_ROOTFS_CEILING,
        };
        self.load_bounded_partition(bytes, ceiling, PartitionKind::System)
    }

    pub fn load_data(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        let ceiling = match self.kind {
            GuestKind::Android => ANDROID_DATA_CEILING,
            GuestKind::Linux => LINUX_ROOTFS_CEILING,
        };
        self.load_bounded_partition(bytes, ceiling, PartitionKind::Data)
    }

    pub fn set_cmdline(&mut self, cmdline: &str) {
        self.kernel_cmdline = crate::boot::truncate_bounded(cmdline, CMDLINE_CAP);
    }

    pub fn cmdline(&self) -> &str {
        &self.kernel_cmdline
    }

    /// Stored as `major*100 + minor` (e.g. 13,0 -> 1300).
    pub fn set_version(&mut self, major: u32, minor: u32) {
        self.version_code = major * 100 + minor;
    }

    pub fn version_code(&self) -> u32 {
        self.version_code
    }

    pub fn set_dalvik_enabled(&mut self, enabled: bool) {
        self.dalvik_enabled = enabled;
    }

    pub fn dalvik_enabled(&self) -> bool {
        self.dalvik_enabled
    }

    /// Requires `state ∈ {Initialized, Stopped}` and a loaded kernel;
    /// transitions `Booting` → `Running`. Missing kernel returns `-1`
    /// without otherwise touching `state`.
    pub fn start(&mut self) -> i32 {
        if !matches!(self.state, GuestState::Initialized | GuestState::Stopped) {
            return -1;
        }
        if self.kernel.is_none() {
            return -1;
        }
        self.state = GuestState::Booting;
        self.state = GuestState::Running;
        log::info!("guest[{}]: running", self.kind_name());
        0
    }

    pub fn pause(&mut self) -> i32 {
        if self.state != GuestState::Running {
            return -1;
        }
        self.state = GuestState::Paused;
        0
    }

    pub fn resume(&mut self) -> i32 {
        if self.state != GuestState::Paused {
            return -1;
        }
        self.state = GuestState::Running;
        0
    }

    /// From any live state → `Stopped`.
    pub fn stop(&mut self) -> i32 {
        self.state = GuestState::Stopped;
        0
    }

    pub fn mark_error(&mut self) {
        self.state = GuestState::Error;
    }

    /// Frees all owned buffers and marks the container destroyed.
    pub fn destroy(&mut self) {
        self.kernel = None;
        self.ramdisk = None;
        self.system_partition = None;
        self.data_partition = None;
        self.state = GuestState::Stopped;
    }

    pub fn handle_syscall(
        &mut self,
        state: &mut SyscallKernelState,
        memory: &mut dyn crate::memory::GuestMemoryView,
        syscall_num: u64,
        args: [u64; 6],
    ) -> i32 {
        let mut ctx = SyscallContext { state, memory };
        syscall::dispatch(&mut ctx, syscall_num, args)
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            GuestKind::Android => "android",
            GuestKind::Linux => "linux",
        }
    }
}

enum PartitionKind {
    System,
    Data,
}

/// Process-wide property table shared across Android guests (§4.7), cap 64
/// entries of `(name, value)`, each ≤128 B; duplicate names update in place.
#[derive(Debug, Default)]
pub struct PropertyTable {
    entries: Vec<(String, String)>,
}

impl PropertyTable {
    pub fn new() -> Self {
        PropertyTable { entries: Vec::new() }
    }

    pub fn set_property(&mut self, name: &str, value: &str) -> i32 {
        if name.len() > PROPERTY_FIELD_CAP || value.len() > PROPERTY_FIELD_CAP {
            return -1;
        }
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_string();
            return 0;
        }
        if self.entries.len() >= PROPERTY_TABLE_CAP {
            return -1;
        }
        self.entries.push((name.to_string(), value.to_string()));
        0
    }

    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatGuestMemory;

    fn linux_kernel_bytes() -> Vec<u8> {
        vec![0x90u8; 4096]
    }

    #[test]
    fn start_without_kernel_fails_and_state_unchanged() {
        let mut guest = GuestContainer::create(GuestKind::Linux, Arch::X86_64);
        assert_eq!(guest.start(), -1);
        assert_eq!(guest.state(), GuestState::Initialized);
    }

    #[test]
    fn full_lifecycle_reaches_running_then_paused_then_stopped() {
        let mut guest = GuestContainer::create(GuestKind::Linux, Arch::X86_64);
        let mut mem = FlatGuestMemory::new(64 << 20);
        let mut boot = BootProtocolState::new();
        guest.load_kernel(&mut mem, &mut boot, &linux_kernel_bytes()).unwrap();
        assert_eq!(guest.start(), 0);
        assert_eq!(guest.state(), GuestState::Running);
        assert_eq!(guest.pause(), 0);
        assert_eq!(guest.state(), GuestState::Paused);
        assert_eq!(guest.resume(), 0);
        assert_eq!(guest.stop(), 0);
        assert_eq!(guest.state(), GuestState::Stopped);
    }

    #[test]
    fn restart_from_stopped_is_allowed() {
        let mut guest = GuestContainer::create(GuestKind::Linux, Arch::X86_64);
        let mut mem = FlatGuestMemory::new(64 << 20);
        let mut boot = BootProtocolState::new();
        guest.load_kernel(&mut mem, &mut boot, &linux_kernel_bytes()).unwrap();
        guest.start();
        guest.stop();
        assert_eq!(guest.start(), 0);
    }

    #[test]
    fn data_partition_over_ceiling_rejected() {
        let mut guest = GuestContainer::create(GuestKind::Linux, Arch::X86_64);
        let huge = vec![0u8; (LINUX_ROOTFS_CEILING + 1) as usize];
        assert!(guest.load_data(&huge).is_err());
    }

    #[test]
    fn arch_name_is_total() {
        for arch in [Arch::Arm32, Arch::Arm64, Arch::X86, Arch::X86_64] {
            assert!(!arch.arch_name().is_empty());
        }
    }

    #[test]
    fn property_table_updates_in_place() {
        let mut props = PropertyTable::new();
        assert_eq!(props.set_property("ro.build.version", "13"), 0);
        assert_eq!(props.set_property("ro.build.version", "14"), 0);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get_property("ro.build.version"), Some("14"));
    }

    #[test]
    fn property_table_enforces_cap() {
        let mut props = PropertyTable::new();
        for i in 0..PROPERTY_TABLE_CAP {
            assert_eq!(props.set_property(&format!("k{i}"), "v"), 0);
        }
        assert_eq!(props.set_property("overflow", "v"), -1);
    }
}
