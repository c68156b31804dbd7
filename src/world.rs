//! Top-level VM world: the value an embedder owns and passes by exclusive
//! reference through dispatch, bundling every process-wide singleton this
//! crate defines. `spec.md` §9 Design Notes; configuration per §10.3 of
//! `SPEC_FULL.md`.

use crate::boot::BootProtocolState;
use crate::guest::PropertyTable;
use crate::kernel_state::SyscallKernelState;

/// The only runtime-configurable knobs: everything else in `spec.md` is a
/// fixed platform constant, not something an embedder tunes.
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    pub entropy_seed: u32,
    pub starting_timer_us: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig { entropy_seed: 0x1234_5678, starting_timer_us: 0 }
    }
}

/// Bundles the kernel state, boot-protocol state, and Android property
/// table. A compliant embedder holds exactly one of these per simulated
/// machine; guest containers are created and driven against it.
pub struct World {
    pub kernel_state: SyscallKernelState,
    pub boot_state: BootProtocolState,
    pub properties: PropertyTable,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let mut kernel_state = SyscallKernelState::with_rng_seed(config.entropy_seed);
        kernel_state.advance_timer(config.starting_timer_us);
        World {
            kernel_state,
            boot_state: BootProtocolState::new(),
            properties: PropertyTable::new(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_has_singleton_identity() {
        let world = World::new();
        assert_eq!(world.kernel_state.identity.pid, 1);
        assert!(world.properties.is_empty());
    }

    #[test]
    fn config_seeds_timer() {
        let world = World::with_config(WorldConfig { entropy_seed: 1, starting_timer_us: 5_000 });
        assert_eq!(world.kernel_state.timer_us, 5_000);
    }
}
