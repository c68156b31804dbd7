//! File descriptor handlers (§4.3 "File descriptors (simulation, not real
//! I/O)"). Reads/writes advance `offset`/`size` bookkeeping only; no
//! backing storage is touched, per `spec.md` §1 non-goals.

use crate::error::Errno;
use crate::kernel_state::fd::{FdKind, CLOEXEC_BIT};
use crate::syscall::SyscallContext;

const STAT_BUF_LEN: usize = 144;

pub fn sys_open(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    open_impl(ctx, args[0], args[1])
}

pub fn sys_openat(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    open_impl(ctx, args[1], args[2])
}

pub fn sys_creat(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    open_impl(ctx, args[0], 0)
}

fn open_impl(ctx: &mut SyscallContext, path_ptr: u64, flags: u64) -> i32 {
    if path_ptr == 0 {
        return Errno::Efault.as_ret();
    }
    match ctx.state.fd_table.alloc(FdKind::File, flags as u32) {
        Some(fd) => fd,
        None => Errno::Emfile.as_ret(),
    }
}

pub fn sys_close(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    if fd == 0 || fd == 1 || fd == 2 {
        return 0;
    }
    if !ctx.state.fd_table.is_open(fd) {
        return Errno::Ebadf.as_ret();
    }
    ctx.state.pipes.remove_by_fd(fd);
    ctx.state.sockets.remove(fd);
    ctx.state.fd_table.close(fd);
    0
}

pub fn sys_read(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    if fd == 0 {
        return 0;
    }
    let slot = match ctx.state.fd_table.get_mut(fd) {
        Some(s) if s.open => s,
        _ => return Errno::Ebadf.as_ret(),
    };
    if slot.kind == FdKind::PipeRead {
        return 0;
    }
    let count = args[2];
    let remaining = slot.size.saturating_sub(slot.offset);
    let n = count.min(remaining);
    slot.offset += n;
    n as i32
}

pub fn sys_write(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    let count = args[2];
    if fd == 1 || fd == 2 {
        return count as i32;
    }
    let slot = match ctx.state.fd_table.get_mut(fd) {
        Some(s) if s.open => s,
        _ => return Errno::Ebadf.as_ret(),
    };
    slot.offset += count;
    slot.size = slot.size.max(slot.offset);
    count as i32
}

const SEEK_SET: u64 = 0;
const SEEK_CUR: u64 = 1;
const SEEK_END: u64 = 2;

pub fn sys_lseek(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    let offset = args[1] as i64;
    let whence = args[2];
    let slot = match ctx.state.fd_table.get_mut(fd) {
        Some(s) if s.open => s,
        _ => return Errno::Ebadf.as_ret(),
    };
    let new_pos = match whence {
        SEEK_SET => {
            if offset < 0 {
                return Errno::Einval.as_ret();
            }
            offset
        }
        SEEK_CUR => slot.offset as i64 + offset,
        SEEK_END => slot.size as i64 + offset,
        _ => return Errno::Einval.as_ret(),
    };
    if new_pos < 0 {
        return Errno::Einval.as_ret();
    }
    slot.offset = new_pos as u64;
    slot.offset as i32
}

pub fn sys_dup(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    let slot = match ctx.state.fd_table.get(fd) {
        Some(s) if s.open => *s,
        _ => return Errno::Ebadf.as_ret(),
    };
    match ctx.state.fd_table.alloc(slot.kind, slot.flags) {
        Some(new_fd) => new_fd,
        None => Errno::Emfile.as_ret(),
    }
}

pub fn sys_dup2(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let oldfd = args[0] as i32;
    let newfd = args[1] as i32;
    if oldfd == newfd {
        if !ctx.state.fd_table.is_open(oldfd) {
            return Errno::Ebadf.as_ret();
        }
        return newfd;
    }
    dup2_impl(ctx, oldfd, newfd, 0)
}

pub fn sys_dup3(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let oldfd = args[0] as i32;
    let newfd = args[1] as i32;
    let flags = args[2];
    if oldfd == newfd {
        return Errno::Einval.as_ret();
    }
    dup2_impl(ctx, oldfd, newfd, flags)
}

fn dup2_impl(ctx: &mut SyscallContext, oldfd: i32, newfd: i32, flags: u64) -> i32 {
    let slot = match ctx.state.fd_table.get(oldfd) {
        Some(s) if s.open => *s,
        _ => return Errno::Ebadf.as_ret(),
    };
    ctx.state.fd_table.close(newfd);
    let mut new_flags = slot.flags;
    if flags & 0x8_0000 != 0 {
        new_flags |= CLOEXEC_BIT;
    }
    if !ctx.state.fd_table.alloc_at(newfd, slot.kind, new_flags) {
        return Errno::Ebadf.as_ret();
    }
    newfd
}

pub fn sys_pipe(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    pipe_impl(ctx, args[0], 0)
}

pub fn sys_pipe2(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    pipe_impl(ctx, args[0], args[1])
}

fn pipe_impl(ctx: &mut SyscallContext, fds_ptr: u64, flags: u64) -> i32 {
    let cloexec = if flags & 0x8_0000 != 0 { CLOEXEC_BIT } else { 0 };
    let read_fd = match ctx.state.fd_table.alloc(FdKind::PipeRead, cloexec) {
        Some(fd) => fd,
        None => return Errno::Emfile.as_ret(),
    };
    let write_fd = match ctx.state.fd_table.alloc(FdKind::PipeWrite, cloexec) {
        Some(fd) => fd,
        None => {
            ctx.state.fd_table.close(read_fd);
            return Errno::Emfile.as_ret();
        }
    };
    if ctx.state.pipes.create(read_fd, write_fd).is_none() {
        ctx.state.fd_table.close(read_fd);
        ctx.state.fd_table.close(write_fd);
        return Errno::Emfile.as_ret();
    }
    let buf = [(read_fd as u32).to_le_bytes(), (write_fd as u32).to_le_bytes()].concat();
    if ctx.memory.write(fds_ptr, 8, &buf).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

fn stat_like(ctx: &mut SyscallContext, buf_ptr: u64) -> i32 {
    let zeros = [0u8; STAT_BUF_LEN];
    if ctx.memory.write(buf_ptr, STAT_BUF_LEN, &zeros).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

pub fn sys_stat(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    stat_like(ctx, args[1])
}

pub fn sys_fstat(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    if !ctx.state.fd_table.is_open(args[0] as i32) {
        return Errno::Ebadf.as_ret();
    }
    stat_like(ctx, args[1])
}

pub fn sys_lstat(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    stat_like(ctx, args[1])
}

pub fn sys_newfstatat(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    stat_like(ctx, args[2])
}

pub fn sys_access(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_faccessat(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_ftruncate(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    match ctx.state.fd_table.get_mut(fd) {
        Some(s) if s.open => {
            s.size = args[1];
            0
        }
        _ => Errno::Ebadf.as_ret(),
    }
}

pub fn sys_truncate(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

fn fd_validated_zero(ctx: &mut SyscallContext, fd: i32) -> i32 {
    if ctx.state.fd_table.is_open(fd) {
        0
    } else {
        Errno::Ebadf.as_ret()
    }
}

pub fn sys_fsync(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    fd_validated_zero(ctx, args[0] as i32)
}

pub fn sys_fdatasync(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    fd_validated_zero(ctx, args[0] as i32)
}

pub fn sys_sync(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_syncfs(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    fd_validated_zero(ctx, args[0] as i32)
}

pub fn sys_getdents(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_getdents64(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

const TIOCGWINSZ: u64 = 0x5413;
const FIONREAD: u64 = 0x541B;

pub fn sys_ioctl(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let request = args[1];
    match request {
        TIOCGWINSZ => {
            let rows: u16 = 24;
            let cols: u16 = 80;
            let xpixel: u16 = 640;
            let ypixel: u16 = 480;
            let mut buf = Vec::with_capacity(8);
            buf.extend_from_slice(&rows.to_le_bytes());
            buf.extend_from_slice(&cols.to_le_bytes());
            buf.extend_from_slice(&xpixel.to_le_bytes());
            buf.extend_from_slice(&ypixel.to_le_bytes());
            if ctx.memory.write(args[2], 8, &buf).is_err() {
                return Errno::Efault.as_ret();
            }
            0
        }
        FIONREAD => {
            if ctx.memory.write(args[2], 4, &0u32.to_le_bytes()).is_err() {
                return Errno::Efault.as_ret();
            }
            0
        }
        _ => 0,
    }
}

const F_DUPFD: u64 = 0;
const F_GETFD: u64 = 1;
const F_SETFD: u64 = 2;
const F_GETFL: u64 = 3;
const F_SETFL: u64 = 4;

pub fn sys_fcntl(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = args[0] as i32;
    let cmd = args[1];
    match cmd {
        F_DUPFD => sys_dup(ctx, args),
        F_GETFD => match ctx.state.fd_table.get(fd) {
            Some(s) if s.open => (s.flags & CLOEXEC_BIT != 0) as i32,
            _ => Errno::Ebadf.as_ret(),
        },
        F_SETFD => match ctx.state.fd_table.get_mut(fd) {
            Some(s) if s.open => {
                if args[2] & 1 != 0 {
                    s.flags |= CLOEXEC_BIT;
                } else {
                    s.flags &= !CLOEXEC_BIT;
                }
                0
            }
            _ => Errno::Ebadf.as_ret(),
        },
        F_GETFL => match ctx.state.fd_table.get(fd) {
            Some(s) if s.open => s.flags as i32,
            _ => Errno::Ebadf.as_ret(),
        },
        F_SETFL => match ctx.state.fd_table.get_mut(fd) {
            Some(s) if s.open => {
                s.flags = args[2] as u32;
                0
            }
            _ => Errno::Ebadf.as_ret(),
        },
        _ => 0,
    }
}

pub fn sys_flock(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_path_noop(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    0
}

pub fn sys_readlink(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    Errno::Einval.as_ret()
}

pub fn sys_readlinkat(_ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    Errno::Einval.as_ret()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_state::SyscallKernelState;
    use crate::memory::FlatGuestMemory;

    fn ctx<'a>(state: &'a mut SyscallKernelState, mem: &'a mut FlatGuestMemory) -> SyscallContext<'a> {
        SyscallContext { state, memory: mem }
    }

    #[test]
    fn fd_lifecycle_scenario() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut c = ctx(&mut state, &mut mem);
        let fd = sys_open(&mut c, [100, 0, 0, 0, 0, 0]);
        assert_eq!(fd, 3);
        assert_eq!(sys_write(&mut c, [3, 0, 10, 0, 0, 0]), 10);
        assert_eq!(sys_lseek(&mut c, [3, 0, SEEK_SET, 0, 0, 0]), 0);
        assert_eq!(sys_read(&mut c, [3, 0, 5, 0, 0, 0]), 5);
        assert_eq!(sys_close(&mut c, [3, 0, 0, 0, 0, 0]), 0);
        assert_eq!(sys_write(&mut c, [3, 0, 1, 0, 0, 0]), Errno::Ebadf.as_ret());
    }

    #[test]
    fn lseek_negative_set_is_einval() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut c = ctx(&mut state, &mut mem);
        let fd = sys_open(&mut c, [100, 0, 0, 0, 0, 0]);
        assert_eq!(sys_lseek(&mut c, [fd as u64, (-1i64) as u64, SEEK_SET, 0, 0, 0]), Errno::Einval.as_ret());
    }

    #[test]
    fn dup2_same_fd_is_identity() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut c = ctx(&mut state, &mut mem);
        let fd = sys_open(&mut c, [100, 0, 0, 0, 0, 0]);
        assert_eq!(sys_dup2(&mut c, [fd as u64, fd as u64, 0, 0, 0, 0]), fd);
    }

    #[test]
    fn pipe_allocates_read_and_write_fds() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut c = ctx(&mut state, &mut mem);
        assert_eq!(sys_pipe(&mut c, [200, 0, 0, 0, 0, 0]), 0);
        let mut buf = [0u8; 8];
        c.memory.read(200, 8, &mut buf).unwrap();
        let read_fd = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let write_fd = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        assert_eq!(read_fd, 3);
        assert_eq!(write_fd, 4);
    }
}
