//! Time handlers (§4.3 "Time"). Backed entirely by `timer_us`; there is no
//! wall-clock access (§5 — no real timeouts at the core level).

use crate::syscall::SyscallContext;

fn write_timespec(ctx: &mut SyscallContext, ptr: u64, us: u64) -> bool {
    let secs = us / 1_000_000;
    let nanos = (us % 1_000_000) * 1000;
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(&secs.to_le_bytes());
    buf.extend_from_slice(&nanos.to_le_bytes());
    ctx.memory.write(ptr, 16, &buf).is_ok()
}

fn write_timeval(ctx: &mut SyscallContext, ptr: u64, us: u64) -> bool {
    let secs = us / 1_000_000;
    let usecs = us % 1_000_000;
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(&secs.to_le_bytes());
    buf.extend_from_slice(&usecs.to_le_bytes());
    ctx.memory.write(ptr, 16, &buf).is_ok()
}

pub fn sys_gettimeofday(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let us = ctx.state.timer_us;
    if args[0] != 0 && !write_timeval(ctx, args[0], us) {
        return crate::error::Errno::Efault.as_ret();
    }
    0
}

pub fn sys_settimeofday(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    if args[0] == 0 {
        return 0;
    }
    let mut buf = [0u8; 16];
    if ctx.memory.read(args[0], 16, &mut buf).is_err() {
        return crate::error::Errno::Efault.as_ret();
    }
    let secs = u64::from_le_bytes(buf[0..8].try_into().unwrap());
    let usecs = u64::from_le_bytes(buf[8..16].try_into().unwrap());
    ctx.state.timer_us = secs * 1_000_000 + usecs;
    0
}

pub fn sys_clock_gettime(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let us = ctx.state.timer_us;
    if !write_timespec(ctx, args[1], us) {
        return crate::error::Errno::Efault.as_ret();
    }
    0
}

pub fn sys_clock_settime(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let mut buf = [0u8; 16];
    if ctx.memory.read(args[1], 16, &mut buf).is_err() {
        return crate::error::Errno::Efault.as_ret();
    }
    let secs = u64::from_le_bytes(buf[0..8].try_into().unwrap());
    let nanos = u64::from_le_bytes(buf[8..16].try_into().unwrap());
    ctx.state.timer_us = secs * 1_000_000 + nanos / 1000;
    0
}

pub fn sys_clock_getres(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    // resolution is fixed at 1000ns, independent of the simulated clock.
    let buf = [0u8, 0, 0, 0, 0, 0, 0, 0, 0xE8u8, 3, 0, 0, 0, 0, 0, 0];
    if ctx.memory.write(args[1], 16, &buf).is_err() {
        return crate::error::Errno::Efault.as_ret();
    }
    0
}

pub fn sys_nanosleep(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let mut buf = [0u8; 16];
    if ctx.memory.read(args[0], 16, &mut buf).is_err() {
        return crate::error::Errno::Efault.as_ret();
    }
    let secs = u64::from_le_bytes(buf[0..8].try_into().unwrap());
    let nanos = u64::from_le_bytes(buf[8..16].try_into().unwrap());
    ctx.state.advance_timer(secs * 1_000_000 + nanos / 1000);
    0
}

pub fn sys_time(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let secs = ctx.state.timer_us / 1_000_000;
    if args[0] != 0 {
        let _ = ctx.memory.write(args[0], 8, &secs.to_le_bytes());
    }
    secs as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_state::SyscallKernelState;
    use crate::memory::FlatGuestMemory;

    #[test]
    fn nanosleep_advances_timer() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        mem.write(128, 16, &[1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        let mut c = SyscallContext { state: &mut state, memory: &mut mem };
        assert_eq!(sys_nanosleep(&mut c, [128, 0, 0, 0, 0, 0]), 0);
        assert_eq!(c.state.timer_us, 1_000_000);
    }
}
