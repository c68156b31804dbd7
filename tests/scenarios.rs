//! End-to-end scenarios exercised through the public dispatch/boot/guest
//! surfaces, one per row in `SPEC_FULL.md` §8.

use guestcore::boot::{android, linux, BootProtocolState, MemType};
use guestcore::guest::{Arch, GuestContainer, GuestKind, GuestState};
use guestcore::syscall::{self, nr, SyscallContext};
use guestcore::{FlatGuestMemory, GuestMemoryView};
use guestcore::world::World;

fn ctx<'a>(world: &'a mut World, mem: &'a mut FlatGuestMemory) -> SyscallContext<'a> {
    SyscallContext { state: &mut world.kernel_state, memory: mem }
}

#[test]
fn scenario_1_fd_lifecycle() {
    let mut world = World::new();
    let mut mem = FlatGuestMemory::new(1 << 16);
    let mut c = ctx(&mut world, &mut mem);

    let fd = syscall::dispatch(&mut c, nr::OPEN, [200, 0, 0, 0, 0, 0]);
    assert_eq!(fd, 3);
    assert_eq!(syscall::dispatch(&mut c, nr::WRITE, [3, 0, 10, 0, 0, 0]), 10);
    assert_eq!(syscall::dispatch(&mut c, nr::LSEEK, [3, 0, 0, 0, 0, 0]), 0);
    assert_eq!(syscall::dispatch(&mut c, nr::READ, [3, 0, 5, 0, 0, 0]), 5);
    assert_eq!(syscall::dispatch(&mut c, nr::CLOSE, [3, 0, 0, 0, 0, 0]), 0);
    assert_eq!(syscall::dispatch(&mut c, nr::WRITE, [3, 0, 1, 0, 0, 0]), -9);
}

#[test]
fn scenario_2_pipe_round_trip_is_stubbed() {
    let mut world = World::new();
    let mut mem = FlatGuestMemory::new(1 << 16);
    let mut c = ctx(&mut world, &mut mem);

    assert_eq!(syscall::dispatch(&mut c, nr::PIPE, [300, 0, 0, 0, 0, 0]), 0);
    let mut fds = [0u8; 8];
    c.memory.read(300, 8, &mut fds).unwrap();
    let read_fd = u32::from_le_bytes(fds[0..4].try_into().unwrap()) as u64;
    let write_fd = u32::from_le_bytes(fds[4..8].try_into().unwrap()) as u64;
    assert_eq!(read_fd, 3);
    assert_eq!(write_fd, 4);

    assert_eq!(syscall::dispatch(&mut c, nr::WRITE, [write_fd, 0, 2, 0, 0, 0]), 2);
    assert_eq!(syscall::dispatch(&mut c, nr::READ, [read_fd, 0, 2, 0, 0, 0]), 0);
    assert_eq!(syscall::dispatch(&mut c, nr::CLOSE, [read_fd, 0, 0, 0, 0, 0]), 0);
    assert_eq!(syscall::dispatch(&mut c, nr::CLOSE, [write_fd, 0, 0, 0, 0, 0]), 0);
}

#[test]
fn scenario_3_socket_handshake() {
    let mut world = World::new();
    let mut mem = FlatGuestMemory::new(1 << 16);
    let mut c = ctx(&mut world, &mut mem);

    let fd = syscall::dispatch(&mut c, nr::SOCKET, [2, 1, 0, 0, 0, 0]);
    assert_eq!(fd, 3);
    assert_eq!(syscall::dispatch(&mut c, nr::BIND, [fd as u64, 0, 0, 0, 0, 0]), 0);
    assert_eq!(syscall::dispatch(&mut c, nr::LISTEN, [fd as u64, 5, 0, 0, 0, 0]), 0);
    assert_eq!(syscall::dispatch(&mut c, nr::ACCEPT, [fd as u64, 0, 0, 0, 0, 0]), -11);
}

fn build_v3_boot_image(kernel_size: u32, ramdisk_size: u32) -> Vec<u8> {
    let header_size: u32 = 1608;
    let mut img = vec![0u8; android::V3_HEADER_MIN_LEN];
    img[0..8].copy_from_slice(android::MAGIC);
    img[8..12].copy_from_slice(&kernel_size.to_le_bytes());
    img[12..16].copy_from_slice(&ramdisk_size.to_le_bytes());
    img[20..24].copy_from_slice(&header_size.to_le_bytes());
    img[40..44].copy_from_slice(&3u32.to_le_bytes());
    let kernel_off = android::round_up(header_size, android::PAGE_SIZE) as usize;
    img.resize(kernel_off + kernel_size as usize, 0xAA);
    img
}

#[test]
fn scenario_4_android_boot() {
    let img = build_v3_boot_image(16384, 0);
    let mut guest_memory = FlatGuestMemory::new(64 << 20);
    let mut boot_state = BootProtocolState::new();
    let mut guest = GuestContainer::create(GuestKind::Android, Arch::Arm64);

    assert_eq!(guest.state(), GuestState::Initialized);
    guest.load_kernel(&mut guest_memory, &mut boot_state, &img).unwrap();
    assert_eq!(boot_state.android_boot.header_version, 3);
    assert_eq!(boot_state.android_boot.kernel_size, 16384);

    assert_eq!(guest.start(), 0);
    assert_eq!(guest.state(), GuestState::Running);
}

#[test]
fn scenario_5_linux_bzimage_detect() {
    let mut with_sig = vec![0u8; 600];
    with_sig[510] = 0x55;
    with_sig[511] = 0xAA;
    with_sig[0x202..0x206].copy_from_slice(&0x5372_6448u32.to_le_bytes());
    assert!(linux::is_bzimage(&with_sig));

    let without_sig = vec![0u8; 600];
    assert!(!linux::is_bzimage(&without_sig));

    let mut guest_memory = FlatGuestMemory::new(4 << 20);
    let mut boot_state = BootProtocolState::new();
    linux::load_kernel(&mut guest_memory, &mut boot_state, &without_sig, 0x10_0000, None).unwrap();
    assert_eq!(boot_state.linux_boot.protocol_version, 0);
    assert_eq!(boot_state.linux_boot.kernel_size, without_sig.len() as u64);
}

#[test]
fn scenario_6_e820_map() {
    let mut boot_state = BootProtocolState::new();
    linux::setup_params(&mut boot_state, None);
    assert_eq!(boot_state.linux_boot.e820.len(), 3);

    let e0 = boot_state.get_e820_entry(0).unwrap();
    assert_eq!((e0.addr, e0.size, e0.mem_type), (0x0, 0xA_0000, MemType::Ram));

    let e1 = boot_state.get_e820_entry(1).unwrap();
    assert_eq!((e1.addr, e1.size, e1.mem_type), (0xA_0000, 0x6_0000, MemType::Reserved));

    let e2 = boot_state.get_e820_entry(2).unwrap();
    assert_eq!(e2.addr, 0x10_0000);
    assert_eq!(e2.mem_type, MemType::Ram);
}

#[test]
fn scenario_7_state_machine_guard() {
    let mut guest = GuestContainer::create(GuestKind::Linux, Arch::X86_64);
    assert_eq!(guest.start(), -1);
    assert_eq!(guest.state(), GuestState::Initialized);
}
