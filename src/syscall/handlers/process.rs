//! Process control handlers (§4.3 "Process control (deliberately stubbed)").
//! No multi-process fidelity: fork/clone/execve deliberately fail, per
//! `spec.md` §1 non-goals.

use crate::error::Errno;
use crate::syscall::SyscallContext;

pub fn sys_no_children(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    Errno::Echild.as_ret()
}

fn signal_target(ctx: &mut SyscallContext, target: i64, signum: i64) -> i32 {
    // kill/tkill/tgkill accept signum==0 (the existence-check idiom); only
    // rt_sigaction restricts to [1,64).
    if !(0..64).contains(&signum) {
        return Errno::Einval.as_ret();
    }
    let pid = ctx.state.identity.pid as i64;
    let tid = ctx.state.identity.tid as i64;
    if target == pid || target == tid {
        0
    } else {
        Errno::Esrch.as_ret()
    }
}

pub fn sys_kill(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    signal_target(ctx, args[0] as i64, args[1] as i64)
}

pub fn sys_tkill(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    signal_target(ctx, args[0] as i64, args[1] as i64)
}

pub fn sys_tgkill(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    signal_target(ctx, args[1] as i64, args[2] as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_state::SyscallKernelState;
    use crate::memory::FlatGuestMemory;

    #[test]
    fn kill_self_succeeds_others_fail() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut c = SyscallContext { state: &mut state, memory: &mut mem };
        assert_eq!(sys_kill(&mut c, [1, 9, 0, 0, 0, 0]), 0);
        assert_eq!(sys_kill(&mut c, [2, 9, 0, 0, 0, 0]), Errno::Esrch.as_ret());
        assert_eq!(sys_kill(&mut c, [1, 100, 0, 0, 0, 0]), Errno::Einval.as_ret());
    }
}
