//! Syscall Dispatch Table (C3). Sparse over the fixed Linux x86-64
//! numbering space; unassigned slots return `-ENOSYS`. See `spec.md` §4.2.

pub mod handlers;
pub mod nr;

use crate::error::Errno;
use crate::kernel_state::SyscallKernelState;
use crate::memory::GuestMemoryView;
use std::sync::OnceLock;

/// Bundles the two things a handler can touch: the process-wide kernel
/// state and the guest's memory. Passed by exclusive reference per the
/// "VM world by reference, not statics" design note.
pub struct SyscallContext<'a> {
    pub state: &'a mut SyscallKernelState,
    pub memory: &'a mut dyn GuestMemoryView,
}

pub type HandlerFn = fn(&mut SyscallContext, [u64; 6]) -> i32;

static DISPATCH_TABLE: OnceLock<Box<[Option<HandlerFn>]>> = OnceLock::new();

fn build_table() -> Box<[Option<HandlerFn>]> {
    use handlers::time as time_mod;
    use handlers::{event, fd, identity, mem, misc, process, sched, signal, socket};

    let mut table: Vec<Option<HandlerFn>> = vec![None; nr::TABLE_SIZE as usize];
    macro_rules! bind {
        ($num:expr, $handler:expr) => {
            table[$num as usize] = Some($handler);
        };
    }

    // File descriptors
    bind!(nr::READ, fd::sys_read);
    bind!(nr::WRITE, fd::sys_write);
    bind!(nr::OPEN, fd::sys_open);
    bind!(nr::CLOSE, fd::sys_close);
    bind!(nr::STAT, fd::sys_stat);
    bind!(nr::FSTAT, fd::sys_fstat);
    bind!(nr::LSTAT, fd::sys_lstat);
    bind!(nr::LSEEK, fd::sys_lseek);
    bind!(nr::DUP, fd::sys_dup);
    bind!(nr::DUP2, fd::sys_dup2);
    bind!(nr::PIPE, fd::sys_pipe);
    bind!(nr::ACCESS, fd::sys_access);
    bind!(nr::FCNTL, fd::sys_fcntl);
    bind!(nr::FLOCK, fd::sys_flock);
    bind!(nr::FSYNC, fd::sys_fsync);
    bind!(nr::FDATASYNC, fd::sys_fdatasync);
    bind!(nr::TRUNCATE, fd::sys_truncate);
    bind!(nr::FTRUNCATE, fd::sys_ftruncate);
    bind!(nr::GETDENTS, fd::sys_getdents);
    bind!(nr::GETCWD, misc::sys_getcwd);
    bind!(nr::CHDIR, misc::sys_chdir);
    bind!(nr::RENAME, fd::sys_path_noop);
    bind!(nr::MKDIR, fd::sys_path_noop);
    bind!(nr::RMDIR, fd::sys_path_noop);
    bind!(nr::CREAT, fd::sys_creat);
    bind!(nr::LINK, fd::sys_path_noop);
    bind!(nr::UNLINK, fd::sys_path_noop);
    bind!(nr::SYMLINK, fd::sys_path_noop);
    bind!(nr::READLINK, fd::sys_readlink);
    bind!(nr::CHMOD, fd::sys_path_noop);
    bind!(nr::FCHMOD, fd::sys_path_noop);
    bind!(nr::CHOWN, fd::sys_path_noop);
    bind!(nr::FCHOWN, fd::sys_path_noop);
    bind!(nr::LCHOWN, fd::sys_path_noop);
    bind!(nr::IOCTL, fd::sys_ioctl);
    bind!(nr::SYNC, fd::sys_sync);
    bind!(nr::STATFS, misc::sys_statfs);
    bind!(nr::FSTATFS, misc::sys_fstatfs);
    bind!(nr::GETDENTS64, fd::sys_getdents64);
    bind!(nr::OPENAT, fd::sys_openat);
    bind!(nr::MKDIRAT, fd::sys_path_noop);
    bind!(nr::FCHOWNAT, fd::sys_path_noop);
    bind!(nr::NEWFSTATAT, fd::sys_newfstatat);
    bind!(nr::UNLINKAT, fd::sys_path_noop);
    bind!(nr::RENAMEAT, fd::sys_path_noop);
    bind!(nr::LINKAT, fd::sys_path_noop);
    bind!(nr::SYMLINKAT, fd::sys_path_noop);
    bind!(nr::READLINKAT, fd::sys_readlinkat);
    bind!(nr::FCHMODAT, fd::sys_path_noop);
    bind!(nr::FACCESSAT, fd::sys_faccessat);
    bind!(nr::DUP3, fd::sys_dup3);
    bind!(nr::PIPE2, fd::sys_pipe2);
    bind!(nr::SYNCFS, fd::sys_syncfs);
    bind!(nr::RENAMEAT2, fd::sys_path_noop);

    // Memory
    bind!(nr::MMAP, mem::sys_mmap);
    bind!(nr::MPROTECT, mem::sys_mprotect);
    bind!(nr::MUNMAP, mem::sys_munmap);
    bind!(nr::BRK, mem::sys_brk);
    bind!(nr::MREMAP, mem::sys_mremap);
    bind!(nr::MADVISE, mem::sys_noop_ok);
    bind!(nr::MLOCK, mem::sys_noop_ok);
    bind!(nr::MUNLOCK, mem::sys_noop_ok);
    bind!(nr::MLOCKALL, mem::sys_noop_ok);
    bind!(nr::MUNLOCKALL, mem::sys_noop_ok);

    // Identity / process info
    bind!(nr::GETPID, identity::sys_getpid);
    bind!(nr::GETUID, identity::sys_getuid);
    bind!(nr::GETGID, identity::sys_getgid);
    bind!(nr::SETUID, identity::sys_setuid);
    bind!(nr::SETGID, identity::sys_setgid);
    bind!(nr::GETEUID, identity::sys_geteuid);
    bind!(nr::GETEGID, identity::sys_getegid);
    bind!(nr::GETPPID, identity::sys_getppid);
    bind!(nr::GETPGRP, identity::sys_getpgrp);
    bind!(nr::SETSID, identity::sys_setsid);
    bind!(nr::SETREUID, identity::sys_setreuid);
    bind!(nr::SETREGID, identity::sys_setregid);
    bind!(nr::GETGROUPS, identity::sys_getgroups);
    bind!(nr::SETRESUID, identity::sys_setresuid);
    bind!(nr::GETRESUID, identity::sys_getresuid);
    bind!(nr::SETRESGID, identity::sys_setresgid);
    bind!(nr::GETRESGID, identity::sys_getresgid);
    bind!(nr::GETPGID, identity::sys_getpgid);
    bind!(nr::SETFSUID, identity::sys_setfsuid);
    bind!(nr::SETFSGID, identity::sys_setfsgid);
    bind!(nr::GETSID, identity::sys_getsid);
    bind!(nr::GETTID, identity::sys_gettid);

    // Signals
    bind!(nr::RT_SIGACTION, signal::sys_rt_sigaction);
    bind!(nr::RT_SIGPROCMASK, signal::sys_rt_sigprocmask);
    bind!(nr::RT_SIGPENDING, signal::sys_rt_sigpending);
    bind!(nr::SIGALTSTACK, signal::sys_sigaltstack);

    // Time
    bind!(nr::GETTIMEOFDAY, time_mod::sys_gettimeofday);
    bind!(nr::SETTIMEOFDAY, time_mod::sys_settimeofday);
    bind!(nr::CLOCK_GETTIME, time_mod::sys_clock_gettime);
    bind!(nr::CLOCK_SETTIME, time_mod::sys_clock_settime);
    bind!(nr::CLOCK_GETRES, time_mod::sys_clock_getres);
    bind!(nr::NANOSLEEP, time_mod::sys_nanosleep);
    bind!(nr::TIME, time_mod::sys_time);

    // Scheduling
    bind!(nr::SCHED_YIELD, sched::sys_sched_yield);
    bind!(nr::GETPRIORITY, sched::sys_getpriority);
    bind!(nr::SETPRIORITY, sched::sys_setpriority);
    bind!(nr::SCHED_SETSCHEDULER, sched::sys_sched_setscheduler);
    bind!(nr::SCHED_GETSCHEDULER, sched::sys_sched_getscheduler);
    bind!(nr::SCHED_GET_PRIORITY_MAX, sched::sys_sched_get_priority_max);
    bind!(nr::SCHED_GET_PRIORITY_MIN, sched::sys_sched_get_priority_min);
    bind!(nr::SCHED_GETAFFINITY, sched::sys_sched_getaffinity);

    // Sockets
    bind!(nr::SOCKET, socket::sys_socket);
    bind!(nr::CONNECT, socket::sys_connect);
    bind!(nr::ACCEPT, socket::sys_accept);
    bind!(nr::SENDTO, socket::sys_sendto);
    bind!(nr::RECVFROM, socket::sys_recvfrom);
    bind!(nr::SHUTDOWN, socket::sys_shutdown);
    bind!(nr::BIND, socket::sys_bind);
    bind!(nr::LISTEN, socket::sys_listen);
    bind!(nr::GETSOCKNAME, socket::sys_getsockname);
    bind!(nr::GETPEERNAME, socket::sys_getpeername);
    bind!(nr::SOCKETPAIR, socket::sys_socketpair);
    bind!(nr::SETSOCKOPT, socket::sys_setsockopt);
    bind!(nr::GETSOCKOPT, socket::sys_getsockopt);
    bind!(nr::ACCEPT4, socket::sys_accept);

    // Process control (stubbed). CLONE/FORK/VFORK/EXECVE/EXECVEAT are left
    // unbound rather than bound to a handler: they have no real behavior to
    // offer, and `syscall_is_implemented` must report false for them, which
    // only an unbound slot (falling through to -ENOSYS below) satisfies.
    bind!(nr::WAIT4, process::sys_no_children);
    bind!(nr::WAITID, process::sys_no_children);
    bind!(nr::KILL, process::sys_kill);
    bind!(nr::TKILL, process::sys_tkill);
    bind!(nr::TGKILL, process::sys_tgkill);

    // Epoll / notify / event / futex
    bind!(nr::EPOLL_CREATE, event::sys_epoll_create);
    bind!(nr::EPOLL_CREATE1, event::sys_epoll_create);
    bind!(nr::TIMERFD_CREATE, event::sys_timerfd_create);
    bind!(nr::EVENTFD, event::sys_eventfd);
    bind!(nr::EVENTFD2, event::sys_eventfd);
    bind!(nr::SIGNALFD, event::sys_signalfd);
    bind!(nr::SIGNALFD4, event::sys_signalfd);
    bind!(nr::INOTIFY_INIT, event::sys_inotify_init);
    bind!(nr::INOTIFY_INIT1, event::sys_inotify_init);
    bind!(nr::EPOLL_CTL, event::sys_event_noop);
    bind!(nr::EPOLL_WAIT, event::sys_event_noop);
    bind!(nr::EPOLL_PWAIT, event::sys_event_noop);
    bind!(nr::INOTIFY_ADD_WATCH, event::sys_inotify_add_watch);
    bind!(nr::INOTIFY_RM_WATCH, event::sys_event_noop);
    bind!(nr::TIMERFD_SETTIME, event::sys_event_noop);
    bind!(nr::TIMERFD_GETTIME, event::sys_event_noop);
    bind!(nr::FUTEX, event::sys_futex);

    // Miscellaneous
    bind!(nr::UNAME, misc::sys_uname);
    bind!(nr::SETHOSTNAME, misc::sys_sethostname);
    bind!(nr::SETDOMAINNAME, misc::sys_setdomainname);
    bind!(nr::UMASK, misc::sys_umask);
    bind!(nr::GETRANDOM, misc::sys_getrandom);
    bind!(nr::MEMFD_CREATE, misc::sys_memfd_create);
    bind!(nr::SYSINFO, misc::sys_sysinfo);
    bind!(nr::GETRUSAGE, misc::sys_getrusage);
    bind!(nr::GETRLIMIT, misc::sys_getrlimit);
    bind!(nr::SETRLIMIT, mem::sys_noop_ok);
    bind!(nr::PRLIMIT64, misc::sys_prlimit64);
    bind!(nr::CAPGET, mem::sys_noop_ok);
    bind!(nr::CAPSET, mem::sys_noop_ok);
    bind!(nr::PRCTL, mem::sys_noop_ok);
    bind!(nr::ARCH_PRCTL, mem::sys_noop_ok);
    bind!(nr::PERSONALITY, mem::sys_noop_ok);
    bind!(nr::SECCOMP, mem::sys_noop_ok);
    bind!(nr::EXIT, misc::sys_exit);
    bind!(nr::EXIT_GROUP, misc::sys_exit);

    table.into_boxed_slice()
}

fn table() -> &'static [Option<HandlerFn>] {
    DISPATCH_TABLE.get_or_init(build_table)
}

/// Dispatches one syscall. Lazily initializes the table on first call,
/// per `spec.md` §4.2.
pub fn dispatch(ctx: &mut SyscallContext, syscall_num: u64, args: [u64; 6]) -> i32 {
    log::trace!("dispatch: syscall {syscall_num}");
    if syscall_num >= nr::TABLE_SIZE {
        return Errno::Enosys.as_ret();
    }
    match table()[syscall_num as usize] {
        Some(handler) => handler(ctx, args),
        None => {
            log::debug!("dispatch: syscall {syscall_num} unimplemented");
            Errno::Enosys.as_ret()
        }
    }
}

/// True only when `n` is bound to a non-`ENOSYS` handler.
pub fn syscall_is_implemented(n: u64) -> bool {
    n < nr::TABLE_SIZE && table()[n as usize].is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_state::SyscallKernelState;
    use crate::memory::FlatGuestMemory;

    #[test]
    fn unassigned_slot_is_enosys() {
        assert!(!syscall_is_implemented(nr::VHANGUP));
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut ctx = SyscallContext { state: &mut state, memory: &mut mem };
        assert_eq!(dispatch(&mut ctx, nr::VHANGUP, [0; 6]), Errno::Enosys.as_ret());
    }

    #[test]
    fn table_size_and_above_is_enosys() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut ctx = SyscallContext { state: &mut state, memory: &mut mem };
        assert_eq!(dispatch(&mut ctx, nr::TABLE_SIZE, [0; 6]), Errno::Enosys.as_ret());
        assert_eq!(dispatch(&mut ctx, nr::TABLE_SIZE + 1000, [0; 6]), Errno::Enosys.as_ret());
    }

    #[test]
    fn implemented_slot_reports_true() {
        assert!(syscall_is_implemented(nr::GETPID));
    }

    #[test]
    fn stubbed_process_control_slots_are_not_implemented() {
        assert!(!syscall_is_implemented(nr::FORK));
        assert!(!syscall_is_implemented(nr::VFORK));
        assert!(!syscall_is_implemented(nr::CLONE));
        assert!(!syscall_is_implemented(nr::EXECVE));
        assert!(!syscall_is_implemented(nr::EXECVEAT));

        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut ctx = SyscallContext { state: &mut state, memory: &mut mem };
        assert_eq!(dispatch(&mut ctx, nr::FORK, [0; 6]), Errno::Enosys.as_ret());
    }
}
