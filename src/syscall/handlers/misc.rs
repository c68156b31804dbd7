//! Miscellaneous handlers (§4.3 "Miscellaneous").

use crate::error::Errno;
use crate::kernel_state::fd::FdKind;
use crate::kernel_state::{CWD_CAP, HOSTNAME_CAP};
use crate::syscall::SyscallContext;

const UTSNAME_FIELD_LEN: usize = 65;

fn write_utsname_field(ctx: &mut SyscallContext, base: u64, field_index: u64, value: &str) -> Result<(), Errno> {
    let addr = base + field_index * UTSNAME_FIELD_LEN as u64;
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(UTSNAME_FIELD_LEN, 0);
    ctx.memory.write(addr, UTSNAME_FIELD_LEN, &bytes)
}

pub fn sys_uname(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let base = args[0];
    let hostname = ctx.state.hostname.clone();
    let fields = [
        "Aurora",
        hostname.as_str(),
        "6.6.0-aurora",
        "#1 SMP Aurora OS",
        "x86_64",
    ];
    for (i, field) in fields.iter().enumerate() {
        if write_utsname_field(ctx, base, i as u64, field).is_err() {
            return Errno::Efault.as_ret();
        }
    }
    0
}

fn bounded_copy_name(ctx: &mut SyscallContext, ptr: u64, len: u64, cap: usize) -> Result<String, Errno> {
    if len as usize >= cap {
        return Err(Errno::Enametoolong);
    }
    let mut buf = vec![0u8; len as usize];
    ctx.memory.read(ptr, len as usize, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).trim_end_matches('\0').to_string())
}

pub fn sys_sethostname(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match bounded_copy_name(ctx, args[0], args[1], HOSTNAME_CAP) {
        Ok(name) => {
            ctx.state.hostname = name;
            0
        }
        Err(e) => e.as_ret(),
    }
}

pub fn sys_setdomainname(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    match bounded_copy_name(ctx, args[0], args[1], HOSTNAME_CAP) {
        Ok(name) => {
            ctx.state.domainname = name;
            0
        }
        Err(e) => e.as_ret(),
    }
}

pub fn sys_getcwd(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let buf_ptr = args[0];
    let size = args[1];
    let cwd = ctx.state.cwd.clone();
    let needed = cwd.len() + 1;
    if (size as usize) < needed {
        return Errno::Erange.as_ret();
    }
    let mut bytes = cwd.into_bytes();
    bytes.push(0);
    if ctx.memory.write(buf_ptr, needed, &bytes).is_err() {
        return Errno::Efault.as_ret();
    }
    needed as i32
}

pub fn sys_chdir(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let path = match super::read_cstring_bounded(ctx, args[0], CWD_CAP) {
        Ok(p) => p,
        Err(e) => return e.as_ret(),
    };
    if !path.starts_with('/') {
        return Errno::Einval.as_ret();
    }
    ctx.state.cwd = path;
    0
}

pub fn sys_umask(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let prev = ctx.state.identity.umask;
    ctx.state.identity.umask = args[0] as u32 & 0o777;
    prev as i32
}

pub fn sys_getrandom(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let buf_ptr = args[0];
    let count = args[1] as usize;
    let mut buf = vec![0u8; count];
    ctx.state.fill_random(&mut buf);
    if ctx.memory.write(buf_ptr, count, &buf).is_err() {
        return Errno::Efault.as_ret();
    }
    count as i32
}

pub fn sys_memfd_create(ctx: &mut SyscallContext, _args: [u64; 6]) -> i32 {
    match ctx.state.fd_table.alloc(FdKind::File, 0) {
        Some(fd) => fd,
        None => Errno::Emfile.as_ret(),
    }
}

const SYSINFO_LEN: usize = 64;

pub fn sys_sysinfo(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let uptime = (ctx.state.timer_us / 1_000_000) as i64;
    let totalram: u64 = 128 * 1024 * 1024;
    let freeram: u64 = 64 * 1024 * 1024;
    let procs: u16 = 1;
    let mem_unit: u32 = 1;
    let mut buf = vec![0u8; SYSINFO_LEN];
    buf[0..8].copy_from_slice(&uptime.to_le_bytes());
    buf[8..16].copy_from_slice(&totalram.to_le_bytes());
    buf[16..24].copy_from_slice(&freeram.to_le_bytes());
    buf[60..62].copy_from_slice(&procs.to_le_bytes());
    buf[56..60].copy_from_slice(&mem_unit.to_le_bytes());
    if ctx.memory.write(args[0], SYSINFO_LEN, &buf).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

pub fn sys_getrusage(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let zeros = vec![0u8; 144];
    if ctx.memory.write(args[1], 144, &zeros).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

pub fn sys_getrlimit(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let infinity = u64::MAX.to_le_bytes();
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(&infinity);
    buf.extend_from_slice(&infinity);
    if ctx.memory.write(args[1], 16, &buf).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

pub fn sys_prlimit64(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    let old_ptr = args[3];
    if old_ptr != 0 {
        let infinity = u64::MAX.to_le_bytes();
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(&infinity);
        buf.extend_from_slice(&infinity);
        if ctx.memory.write(old_ptr, 16, &buf).is_err() {
            return Errno::Efault.as_ret();
        }
    }
    0
}

pub fn sys_statfs_like(ctx: &mut SyscallContext, buf_ptr: u64) -> i32 {
    let mut buf = vec![0u8; 120];
    buf[0..8].copy_from_slice(&0x137Du64.to_le_bytes());
    buf[8..16].copy_from_slice(&4096u64.to_le_bytes());
    buf[16..24].copy_from_slice(&1_000_000u64.to_le_bytes());
    buf[24..32].copy_from_slice(&500_000u64.to_le_bytes());
    buf[32..40].copy_from_slice(&500_000u64.to_le_bytes());
    if ctx.memory.write(buf_ptr, 120, &buf).is_err() {
        return Errno::Efault.as_ret();
    }
    0
}

pub fn sys_statfs(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    sys_statfs_like(ctx, args[1])
}

pub fn sys_fstatfs(ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    sys_statfs_like(ctx, args[1])
}

pub fn sys_exit(_ctx: &mut SyscallContext, args: [u64; 6]) -> i32 {
    args[0] as i32
}
