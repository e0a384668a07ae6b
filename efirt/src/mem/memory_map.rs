// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of the memory map the boot loader hands to the kernel.
//!
//! The firmware lays descriptors out with its own stride, `desc_size`, which
//! is allowed to be larger than [`MemoryDescriptor`] so that future revisions
//! can append fields. Entries are therefore addressed by stride and read
//! unaligned, never by indexing a `[MemoryDescriptor]` slice.

use core::fmt::{self, Debug, Display, Formatter};
use core::mem::size_of;
use core::ptr;

pub use efirt_raw::memory::{MemoryAttribute, MemoryDescriptor, MemoryType, PAGE_SIZE};

/// Geometry of a memory map, as reported by `GetMemoryMap`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryMapMeta {
    /// The size of the map in bytes.
    pub map_size: usize,
    /// The stride between descriptors. Note that this is the reference
    /// and never `size_of::<MemoryDescriptor>()`!
    pub desc_size: usize,
    /// The version of the descriptor format.
    pub desc_version: u32,
}

impl MemoryMapMeta {
    /// Returns the amount of entries in the map.
    ///
    /// A trailing partial descriptor is ignored.
    #[must_use]
    pub const fn entry_count(&self) -> usize {
        match self.desc_size {
            0 => 0,
            size => self.map_size / size,
        }
    }
}

/// Reasons a memory map cannot be used.
///
/// Any of these makes the descriptor fields unreadable, so attaching must
/// stop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryMapError {
    /// The descriptor format version is not [`MemoryDescriptor::VERSION`].
    UnsupportedVersion(u32),
    /// The stride is smaller than the descriptor itself.
    DescriptorTooSmall(usize),
    /// The buffer is shorter than the declared map size.
    BufferTooSmall,
}

impl Display for MemoryMapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(v) => write!(f, "unsupported descriptor version {v}"),
            Self::DescriptorTooSmall(s) => write!(f, "descriptor size {s} too small"),
            Self::BufferTooSmall => f.write_str("memory map buffer shorter than map size"),
        }
    }
}

impl core::error::Error for MemoryMapError {}

/// A validated view of a memory map buffer.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMapRef<'a> {
    buf: &'a [u8],
    meta: MemoryMapMeta,
    len: usize,
}

impl<'a> MemoryMapRef<'a> {
    /// Constructs a new [`MemoryMapRef`] after checking the geometry.
    ///
    /// The descriptor contents themselves are trusted: overlapping or
    /// out-of-range entries are not detected.
    pub fn new(buffer: &'a [u8], meta: MemoryMapMeta) -> Result<Self, MemoryMapError> {
        if meta.desc_version != MemoryDescriptor::VERSION {
            return Err(MemoryMapError::UnsupportedVersion(meta.desc_version));
        }
        if meta.desc_size < size_of::<MemoryDescriptor>() {
            return Err(MemoryMapError::DescriptorTooSmall(meta.desc_size));
        }
        if buffer.len() < meta.map_size {
            return Err(MemoryMapError::BufferTooSmall);
        }
        Ok(Self {
            buf: buffer,
            meta,
            len: meta.entry_count(),
        })
    }

    /// The geometry this map was validated against.
    #[must_use]
    pub const fn meta(&self) -> MemoryMapMeta {
        self.meta
    }

    /// Number of descriptors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the map has no descriptors.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a copy of the descriptor at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<MemoryDescriptor> {
        if index >= self.len {
            return None;
        }
        let offset = index * self.meta.desc_size;
        let bytes = self.buf.get(offset..offset + size_of::<MemoryDescriptor>())?;
        // SAFETY: `bytes` covers a whole descriptor and every bit pattern is
        // a valid `MemoryDescriptor`.
        Some(unsafe { ptr::read_unaligned(bytes.as_ptr().cast::<MemoryDescriptor>()) })
    }

    /// Returns an iterator over the descriptors.
    #[must_use]
    pub const fn entries(&self) -> MemoryMapIter<'a> {
        MemoryMapIter {
            memory_map: *self,
            index: 0,
        }
    }
}

/// An iterator over the descriptors of a [`MemoryMapRef`].
#[derive(Debug, Clone)]
pub struct MemoryMapIter<'a> {
    memory_map: MemoryMapRef<'a>,
    index: usize,
}

impl Iterator for MemoryMapIter<'_> {
    type Item = MemoryDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let desc = self.memory_map.get(self.index)?;

        self.index += 1;

        Some(desc)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let sz = self.memory_map.len() - self.index;

        (sz, Some(sz))
    }
}

impl ExactSizeIterator for MemoryMapIter<'_> {}
