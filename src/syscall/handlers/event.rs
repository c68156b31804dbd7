//! Epoll / notify / event / futex handlers (§4.3).

use crate::error::Errno;
use crate::kernel_state::fd::FdKind;
use crate::syscall::SyscallContext;

fn alloc_event_fd(ctx: &mut SyscallContext) -> i32 {
    match ctx.state.fd_table.alloc(FdKind::Event, 0) {
        Some(fd) => fd,
        None => Errno::Emfile.as_ret(),
    }
}

pub fn sys_epoll_create(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    alloc_event_fd(ctx)
}

pub fn sys_eventfd(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    alloc_event_fd(ctx)
}

pub fn sys_timerfd_create(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    alloc_event_fd(ctx)
}

pub fn sys_signalfd(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    alloc_event_fd(ctx)
}

pub fn sys_inotify_init(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    alloc_event_fd(ctx)
}

pub fn sys_event_noop(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_inotify_add_watch(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    1
}

const FUTEX_CMD_MASK: u64 = 0x7F;
const FUTEX_WAIT: u64 = 0;
const FUTEX_WAKE: u64 = 1;

pub fn sys_futex(_ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match args[1] & FUTEX_CMD_MASK {
        FUTEX_WAIT => Errno::Eagain.as_ret(),
        FUTEX_WAKE => 0,
        _ => 0,
    }
}
