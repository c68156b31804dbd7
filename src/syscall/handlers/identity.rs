//! Identity and process-info handlers (§4.3 "Identity and process info").

use crate::error::Errno;
use crate::syscall::SyscallContext;

pub fn sys_getpid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.pid as i32
}

pub fn sys_getppid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    if ctx.state.identity.pid == 1 {
        1
    } else {
        0
    }
}

pub fn sys_gettid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.tid as i32
}

pub fn sys_getuid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.uid as i32
}

pub fn sys_geteuid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.euid as i32
}

pub fn sys_getgid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.gid as i32
}

pub fn sys_getegid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.egid as i32
}

pub fn sys_getpgrp(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.pid as i32
}

pub fn sys_getpgid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.pid as i32
}

pub fn sys_getsid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.pid as i32
}

pub fn sys_setsid(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    ctx.state.identity.pid as i32
}

pub fn sys_setuid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    ctx.state.identity.uid = args[0] as u32;
    ctx.state.identity.euid = args[0] as u32;
    0
}

pub fn sys_setgid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    ctx.state.identity.gid = args[0] as u32;
    ctx.state.identity.egid = args[0] as u32;
    0
}

pub fn sys_setreuid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let ruid = args[0] as u32;
    let euid = args[1] as u32;
    if ruid != u32::MAX {
        ctx.state.identity.uid = ruid;
    }
    if euid != u32::MAX {
        ctx.state.identity.euid = euid;
    }
    0
}

pub fn sys_setregid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let rgid = args[0] as u32;
    let egid = args[1] as u32;
    if rgid != u32::MAX {
        ctx.state.identity.gid = rgid;
    }
    if egid != u32::MAX {
        ctx.state.identity.egid = egid;
    }
    0
}

pub fn sys_setresuid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    ctx.state.identity.uid = args[0] as u32;
    ctx.state.identity.euid = args[1] as u32;
    0
}

pub fn sys_setresgid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    ctx.state.identity.gid = args[0] as u32;
    ctx.state.identity.egid = args[1] as u32;
    0
}

pub fn sys_setfsuid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let prev = ctx.state.identity.fsuid;
    ctx.state.identity.fsuid = args[0] as u32;
    prev as i32
}

pub fn sys_setfsgid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let prev = ctx.state.identity.fsgid;
    ctx.state.identity.fsgid = args[0] as u32;
    prev as i32
}

pub fn sys_getresuid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let uid = ctx.state.identity.uid as u64;
    if write_triplet(ctx, args[0], args[1], args[2], uid, uid, uid).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

pub fn sys_getresgid(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let gid = ctx.state.identity.gid as u64;
    if write_triplet(ctx, args[0], args[1], args[2], gid, gid, gid).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

fn write_triplet(
    ctx: &mut SyscallContext,
    a: u64,
    b: u64,
    c: u64,
    va: u64,
    vb: u64,
    vc: u64,
) -> Result<(), Errno> {
    ctx.memory.write(a, 4, &(va as u32).to_le_bytes())?;
    ctx.memory.write(b, 4, &(vb as u32).to_le_bytes())?;
    ctx.memory.write(c, 4, &(vc as u32).to_le_bytes())?;
    Ok(())
}

pub fn sys_getgroups(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let size = args[0];
    if size >= 1 {
        let gid = ctx.state.identity.gid;
        if ctx.memory.write(args[1], 4, &gid.to_le_bytes()).is_err() {
            return Errno::Efault.as_ret();
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_state::SyscallKernelState;
    use crate::memory::FlatGuestMemory;

    #[test]
    fn getppid_returns_one_for_singleton_pid() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut ctx = SyscallContext { state: &mut state, memory: &mut mem };
        assert_eq!(sys_getppid(&mut ctx, [0; 6]), 1);
    }
}
