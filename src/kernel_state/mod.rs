//! Syscall Kernel State (C2) — the process-wide singleton tables the
//! handlers in `crate::syscall::handlers` mutate. Per the Design Notes in
//! `spec.md` §9 this is modeled as an explicit value owned by the embedder
//! (see `crate::world::World`), not as file-scope statics.

pub mod fd;
pub mod mmap;
pub mod pipe;
pub mod signal;
pub mod socket;

use fd::FdTable;
use mmap::MmapTable;
use pipe::PipeTable;
use signal::SignalState;
use socket::SocketTable;

pub const CWD_CAP: usize = 256;
pub const HOSTNAME_CAP: usize = 64;
pub const BRK_MIN: u64 = 0x1000_0000;
pub const BRK_MAX: u64 = 0x4000_0000;
pub const MMAP_BASE: u64 = 0x4000_0000;

#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub euid: u32,
    pub egid: u32,
    pub fsuid: u32,
    pub fsgid: u32,
    pub pid: u32,
    pub tid: u32,
    pub umask: u32,
}

impl Identity {
    fn new() -> Self {
        Identity { uid: 0, gid: 0, euid: 0, egid: 0, fsuid: 0, fsgid: 0, pid: 1, tid: 1, umask: 0o022 }
    }
}

pub struct SyscallKernelState {
    pub identity: Identity,
    pub cwd: String,
    pub hostname: String,
    pub domainname: String,
    pub brk_ptr: u64,
    pub mmap_bump: u64,
    pub timer_us: u64,
    pub fd_table: FdTable,
    pub pipes: PipeTable,
    pub sockets: SocketTable,
    pub mmaps: MmapTable,
    pub signals: SignalState,
    rng_state: u32,
}

impl SyscallKernelState {
    pub fn new() -> Self {
        SyscallKernelState::with_rng_seed(0x1234_5678)
    }

    pub fn with_rng_seed(seed: u32) -> Self {
        SyscallKernelState {
            identity: Identity::new(),
            cwd: "/".to_string(),
            hostname: String::new(),
            domainname: String::new(),
            brk_ptr: BRK_MIN,
            mmap_bump: MMAP_BASE,
            timer_us: 0,
            fd_table: FdTable::new(),
            pipes: PipeTable::new(),
            sockets: SocketTable::new(),
            mmaps: MmapTable::new(),
            signals: SignalState::new(),
            rng_state: seed,
        }
    }

    /// Deterministic LCG per `spec.md` §4.3 `getrandom` contract: the C
    /// source had an inconsistent fill; this always fills the buffer.
    pub fn fill_random(&mut self, out: &mut [u8]) {
        for byte in out.iter_mut() {
            self.rng_state = self.rng_state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            *byte = (self.rng_state >> 16) as u8;
        }
    }

    pub fn advance_timer(&mut self, delta_us: u64) {
        self.timer_us = self.timer_us.saturating_add(delta_us);
    }
}

impl Default for SyscallKernelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brk_starts_in_range() {
        let state = SyscallKernelState::new();
        assert!(state.brk_ptr >= BRK_MIN && state.brk_ptr <= BRK_MAX);
    }

    #[test]
    fn getrandom_always_fills_buffer() {
        let mut state = SyscallKernelState::new();
        let mut buf = [0u8; 16];
        state.fill_random(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }
}
