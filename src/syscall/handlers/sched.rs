//! Scheduling handlers (§4.3 "Scheduling"). Single cooperative thread: all
//! of these report a fixed, trivial scheduling world.

use crate::syscall::SyscallContext;

const SCHED_OTHER: i32 = 0;

pub fn sys_sched_yield(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_getpriority(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_setpriority(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_sched_setscheduler(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_sched_getscheduler(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    SCHED_OTHER
}

pub fn sys_sched_get_priority_max(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    99
}

pub fn sys_sched_get_priority_min(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    1
}

pub fn sys_sched_getaffinity(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let buf_ptr = args[2];
    let buf_len = args[1];
    if buf_len >= 8 {
        let _ = ctx.memory.write(buf_ptr, 1, &[0x01]);
    }
    0
}
