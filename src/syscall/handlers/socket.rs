//! Socket handlers (§4.3 "Sockets"). No real networking; connections and
//! listen state are bookkeeping only.

use crate::error::Errno;
use crate::kernel_state::fd::FdKind;
use crate::syscall::SyscallContext;

pub fn sys_socket(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let fd = match ctx.state.fd_table.alloc(FdKind::Socket, 0) {
        Some(fd) => fd,
        None => return Errno::Emfile.as_ret(),
    };
    ctx.state.sockets.create(fd, args[0] as i32, args[1] as i32, args[2] as i32);
    fd
}

fn require_socket<'a>(
    ctx: &'a mut SyscallContext,
    fd: i32,
) -> Result<&'a mut crate::kernel_state::socket::SocketEntry, i32> {
    if !ctx.state.fd_table.is_open(fd) {
        return Err(Errno::Ebadf.as_ret());
    }
    ctx.state.sockets.find_mut(fd).ok_or(Errno::Enotsock.as_ret())
}

pub fn sys_bind(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => 0,
        Err(e) => e,
    }
}

pub fn sys_listen(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(entry) => {
            entry.listening = true;
            0
        }
        Err(e) => e,
    }
}

pub fn sys_connect(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(entry) => {
            entry.connected = true;
            0
        }
        Err(e) => e,
    }
}

pub fn sys_shutdown(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => 0,
        Err(e) => e,
    }
}

pub fn sys_accept(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => Errno::Eagain.as_ret(),
        Err(e) => e,
    }
}

pub fn sys_getsockname(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => 0,
        Err(e) => e,
    }
}

pub fn sys_getpeername(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => Errno::Enotconn.as_ret(),
        Err(e) => e,
    }
}

pub fn sys_sendto(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => args[2] as i32,
        Err(e) => e,
    }
}

pub fn sys_recvfrom(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => Errno::Eagain.as_ret(),
        Err(e) => e,
    }
}

pub fn sys_setsockopt(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => 0,
        Err(e) => e,
    }
}

pub fn sys_getsockopt(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match require_socket(ctx, args[0] as i32) {
        Ok(_) => 0,
        Err(e) => e,
    }
}

pub fn sys_socketpair(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let family = args[0] as i32;
    let sock_type = args[1] as i32;
    let protocol = args[2] as i32;
    let fd_a = match ctx.state.fd_table.alloc(FdKind::Socket, 0) {
        Some(fd) => fd,
        None => return Errno::Emfile.as_ret(),
    };
    let fd_b = match ctx.state.fd_table.alloc(FdKind::Socket, 0) {
        Some(fd) => fd,
        None => {
            ctx.state.fd_table.close(fd_a);
            return Errno::Emfile.as_ret();
        }
    };
    ctx.state.sockets.create(fd_a, family, sock_type, protocol);
    ctx.state.sockets.create(fd_b, family, sock_type, protocol);
    let buf = [(fd_a as u32).to_le_bytes(), (fd_b as u32).to_le_bytes()].concat();
    if ctx.memory.write(args[3], 8, &buf).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_state::SyscallKernelState;
    use crate::memory::FlatGuestMemory;

    #[test]
    fn socket_handshake_scenario() {
        let mut state = SyscallKernelState::new();
        let mut mem = FlatGuestMemory::new(4096);
        let mut c = SyscallContext { state: &mut state, memory: &mut mem };
        let fd = sys_socket(&mut c, [2, 1, 0, 0, 0, 0]);
        assert_eq!(fd, 3);
        assert_eq!(sys_bind(&mut c, [fd as u64, 0, 0, 0, 0, 0]), 0);
        assert_eq!(sys_listen(&mut c, [fd as u64, 5, 0, 0, 0, 0]), 0);
        assert_eq!(sys_accept(&mut c, [fd as u64, 0, 0, 0, 0, 0]), Errno::Eagain.as_ret());
    }
}
