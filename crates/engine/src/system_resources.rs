// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reads the host's logical CPU count and available memory, the two
//! inputs `annorun_core::config::default_pool_size` needs to compute a
//! pool size when neither the environment nor a CLI flag overrides it.

use sysinfo::System;

#[derive(Debug, Clone, Copy)]
pub struct SystemResources {
    pub logical_cpus: usize,
    pub available_memory_gb: u64,
}

pub fn detect() -> SystemResources {
    let mut sys = System::new();
    sys.refresh_memory();
    SystemResources {
        logical_cpus: num_cpus::get(),
        available_memory_gb: (sys.available_memory() / (1024 * 1024 * 1024)).max(1),
    }
}

#[cfg(test)]
#[path = "system_resources_tests.rs"]
mod tests;
