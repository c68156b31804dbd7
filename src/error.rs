//! Error types for the two boundaries the core exposes: the syscall ABI
//! (negated-errno `i32`) and the loader/lifecycle surface (`-1` on failure).

use thiserror::Error;

/// POSIX errno values the syscall handlers can return, kept as a dedicated
/// type per the "don't sprinkle raw `-14` constants" guidance: every handler
/// builds one of these and the dispatcher negates it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    Eperm = 1,
    Esrch = 3,
    Echild = 10,
    Eagain = 11,
    Efault = 14,
    Ebadf = 9,
    Einval = 22,
    Emfile = 24,
    Erange = 34,
    Enosys = 38,
    Enametoolong = 36,
    Enomem = 12,
    Enotsock = 88,
    Enotconn = 107,
}

impl Errno {
    /// Negated value as it travels over the syscall ABI.
    pub const fn as_ret(self) -> i32 {
        -(self as i32)
    }
}

impl From<Errno> for i32 {
    fn from(e: Errno) -> i32 {
        e.as_ret()
    }
}

/// Errors from the boot-image loaders and the guest container lifecycle.
/// Public entry points collapse this to `-1` (per `spec.md` §7) after
/// logging the detail — callers never see this type directly.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed boot image: {0}")]
    ParseError(&'static str),

    #[error("resource table exhausted: {0}")]
    ResourceExhaustion(&'static str),

    #[error("invalid state transition: {0}")]
    StateViolation(&'static str),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Collapses a `CoreResult` to the public `i32` contract (`0` / `-1`),
/// logging the error detail rather than discarding it.
pub fn collapse(result: CoreResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{e}");
            -1
        }
    }
}
