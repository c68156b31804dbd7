//! Linux Boot Parser (C7). Detects and loads bzImage kernels, installs the
//! default E820 map and cmdline, and computes a KASLR offset. `spec.md`
//! §4.6/§6.2/§6.3.

use super::{truncate_bounded, BootProtocolState, MemType};
use crate::error::CoreError;
use crate::memory::FlatGuestMemory;

const BOOT_SIG_OFFSET: usize = 510;
const BOOT_SIG: [u8; 2] = [0x55, 0xAA];
const HDR_S_OFFSET: usize = 0x1F1;
const HDR_S_MAGIC: u32 = 0x5372_6448; // "HdrS"
const SETUP_SECTS_OFFSET: usize = 0x1F1;
const DEFAULT_SETUP_SECTS: u8 = 4;
const SECTOR_SIZE: u64 = 512;

const DEFAULT_CMDLINE: &str = "console=ttyS0 root=/dev/ram0 rw";

const ESP_RESET: u64 = 0x9_0000;
const EBP_RESET: u64 = 0x7000;

const KASLR_ALIGN: u64 = 2 * 1024 * 1024;
const KASLR_BASE: u64 = 0x100_0000;
const KASLR_LIMIT: u64 = 0x400_0000;

/// `bytes[510..512] == 0x55AA` and the `"HdrS"` magic sits at `0x1F1`+1
/// (the signature follows the single `setup_sects` byte at the same page).
pub fn is_bzimage(bytes: &[u8]) -> bool {
    if bytes.len() < 0x202 + 4 {
        return false;
    }
    if bytes[BOOT_SIG_OFFSET..BOOT_SIG_OFFSET + 2] != BOOT_SIG {
        return false;
    }
    let magic = u32::from_le_bytes(bytes[0x202..0x206].try_into().unwrap());
    magic == HDR_S_MAGIC
}

fn setup_sects_or_default(bytes: &[u8]) -> u8 {
    if bytes.len() > SETUP_SECTS_OFFSET {
        let raw = bytes[SETUP_SECTS_OFFSET];
        if raw != 0 {
            return raw;
        }
    }
    DEFAULT_SETUP_SECTS
}

/// Loads a kernel image into the guest. Non-bzImage input falls back to a
/// raw-kernel copy (no setup-header parsing) per §4.6.
pub fn load_kernel(
    guest_memory: &mut FlatGuestMemory,
    boot_state: &mut BootProtocolState,
    kernel_image: &[u8],
    guest_kernel_dst: u64,
    cmdline: Option<&str>,
) -> Result<(), CoreError> {
    let (payload, protocol_version) = if is_bzimage(kernel_image) {
        let setup_size = (setup_sects_or_default(kernel_image) as u64 + 1) * SECTOR_SIZE;
        let setup_size = setup_size as usize;
        if setup_size >= kernel_image.len() {
            return Err(CoreError::ParseError("bzImage shorter than its own setup size"));
        }
        (&kernel_image[setup_size..], 0x020Cu16)
    } else {
        (kernel_image, 0u16)
    };

    if guest_memory.write(guest_kernel_dst, payload.len(), payload).is_err() {
        return Err(CoreError::ParseError("kernel copy out of guest bounds"));
    }

    boot_state.linux_boot.initialized = true;
    boot_state.linux_boot.protocol_version = protocol_version;
    boot_state.linux_boot.kernel_addr = guest_kernel_dst;
    boot_state.linux_boot.kernel_size = payload.len() as u64;

    log::debug!(
        "linux boot: bzimage={} size={}",
        protocol_version != 0,
        payload.len()
    );

    setup_params(boot_state, cmdline);
    Ok(())
}

/// Installs the default 3-entry E820 map and resolves the cmdline
/// precedence (caller-provided, else existing, else the hardcoded default).
/// This map is fixed by contract, independent of actual guest memory size
/// passed elsewhere — callers needing a larger top region patch
/// `linux_boot.e820` after this call.
pub fn setup_params(boot_state: &mut BootProtocolState, cmdline: Option<&str>) {
    boot_state.linux_boot.e820.clear();
    boot_state.add_e820_entry(0x0, 0xA_0000, MemType::Ram);
    boot_state.add_e820_entry(0xA_0000, 0x6_0000, MemType::Reserved);
    boot_state.add_e820_entry(0x10_0000, mem_size_default() - 0x10_0000, MemType::Ram);

    let resolved = match cmdline {
        Some(c) if !c.is_empty() => c.to_string(),
        _ if !boot_state.linux_boot.cmdline.is_empty() => boot_state.linux_boot.cmdline.clone(),
        _ => DEFAULT_CMDLINE.to_string(),
    };
    boot_state.linux_boot.cmdline = truncate_bounded(&resolved, 512);
}

/// Platform memory size used to size the top E820 entry. Kept local since
/// the Guest Container (C8) owns the authoritative per-guest memory size;
/// this is the fallback used when `setup_params` is called standalone.
fn mem_size_default() -> u64 {
    128 * 1024 * 1024
}

/// Sizes the top E820 entry against an actual guest memory size instead of
/// the fallback constant, replacing whatever `setup_params` installed.
pub fn resize_top_e820(boot_state: &mut BootProtocolState, mem_size: u64) {
    if let Some(last) = boot_state.linux_boot.e820.last_mut() {
        if last.addr == 0x10_0000 && mem_size > 0x10_0000 {
            last.size = mem_size - 0x10_0000;
        }
    }
}

/// ESP=0x90000, EBP=0x7000, matching the real-mode reset vector a Linux
/// bzImage expects control to be handed off at.
pub fn setup_cpu(guest_memory: &mut FlatGuestMemory) {
    guest_memory.register_set(4, ESP_RESET);
    guest_memory.register_set(5, EBP_RESET);
}

/// `offset = (entropy mod slots) * 2MiB`, placed within `[0x100_0000,
/// 0x400_0000)`. Publishes the resolved load address as `kernel_addr`.
pub fn setup_kaslr(boot_state: &mut BootProtocolState, entropy: u64) -> u64 {
    let slots = (KASLR_LIMIT - KASLR_BASE) / KASLR_ALIGN;
    let offset = (entropy % slots) * KASLR_ALIGN;
    boot_state.linux_boot.kaslr_offset = offset;
    boot_state.linux_boot.kernel_addr = KASLR_BASE + offset;
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_bzimage(setup_sects: u8, kernel_payload: &[u8]) -> Vec<u8> {
        let setup_size = (setup_sects as usize + 1) * SECTOR_SIZE as usize;
        let mut img = vec![0u8; setup_size];
        img[SETUP_SECTS_OFFSET] = setup_sects;
        img[BOOT_SIG_OFFSET..BOOT_SIG_OFFSET + 2].copy_from_slice(&BOOT_SIG);
        img[0x202..0x206].copy_from_slice(&HDR_S_MAGIC.to_le_bytes());
        img.extend_from_slice(kernel_payload);
        img
    }

    #[test]
    fn detects_bzimage() {
        let img = build_bzimage(4, &[0xAAu8; 100]);
        assert!(is_bzimage(&img));
    }

    #[test]
    fn rejects_non_bzimage() {
        assert!(!is_bzimage(&[0u8; 1024]));
    }

    #[test]
    fn default_e820_map_has_three_entries() {
        let mut state = BootProtocolState::new();
        setup_params(&mut state, None);
        assert_eq!(state.linux_boot.e820.len(), 3);
        assert_eq!(state.linux_boot.e820[0].addr, 0);
        assert_eq!(state.linux_boot.e820[1].mem_type, MemType::Reserved);
        assert_eq!(state.linux_boot.e820[2].addr, 0x10_0000);
    }

    #[test]
    fn cmdline_defaults_when_none_given() {
        let mut state = BootProtocolState::new();
        setup_params(&mut state, None);
        assert_eq!(state.linux_boot.cmdline, DEFAULT_CMDLINE);
    }

    #[test]
    fn cmdline_prefers_caller_argument() {
        let mut state = BootProtocolState::new();
        setup_params(&mut state, Some("quiet"));
        assert_eq!(state.linux_boot.cmdline, "quiet");
    }

    #[test]
    fn load_kernel_strips_setup_sectors() {
        let payload = vec![0x42u8; 4096];
        let img = build_bzimage(4, &payload);
        let mut mem = FlatGuestMemory::new(1 << 20);
        let mut state = BootProtocolState::new();
        load_kernel(&mut mem, &mut state, &img, 0x10_0000, None).unwrap();
        assert_eq!(state.linux_boot.kernel_size, payload.len() as u64);
        let mut out = vec![0u8; payload.len()];
        mem.read(0x10_0000, payload.len(), &mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn kaslr_offset_within_range_and_aligned() {
        let mut state = BootProtocolState::new();
        let offset = setup_kaslr(&mut state, 12345);
        assert!(offset < KASLR_LIMIT - KASLR_BASE);
        assert_eq!(offset % KASLR_ALIGN, 0);
    }
}
