//! Guest-OS Virtualization Core: a Linux x86-64 syscall emulation table,
//! Android/Linux boot-image parsers, and guest VM container lifecycle.
//! See `SPEC_FULL.md` for the full component breakdown (C1-C8).

pub mod boot;
pub mod error;
pub mod guest;
pub mod kernel_state;
pub mod memory;
pub mod syscall;
pub mod world;

pub use error::{CoreError, CoreResult, Errno};
pub use guest::{Arch, GuestContainer, GuestKind, GuestState, PropertyTable};
pub use memory::{FlatGuestMemory, GuestMemoryView};
pub use world::{World, WorldConfig};
