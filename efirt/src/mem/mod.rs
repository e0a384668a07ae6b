// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory map parsing and the runtime address space built from it.

pub mod memory_map;
pub mod runtime_map;

pub use memory_map::{MemoryMapError, MemoryMapMeta, MemoryMapRef};
pub use runtime_map::{CacheMode, MapError, PageMapper, Protection, RuntimeMapping, RuntimeRegion};
