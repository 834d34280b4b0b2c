/*
 * mempool.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte, a cross-platform email client.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Tagliacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Tagliacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Bump allocator for one frame's header storage: many small allocations, released in bulk.

/// Handle to bytes allocated from a [`MemPool`].
///
/// Handles stay valid until the next `flush`; the generation lets debug builds catch a handle
/// that outlived its pool contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRef {
    slot: Slot,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Block { index: u32, start: u32, len: u32 },
    Large { index: u32 },
}

/// Arena of fixed-capacity blocks plus a side list of oversize allocations.
///
/// Blocks never reallocate, so a handle always resolves to the same bytes. There is no
/// per-allocation free.
#[derive(Debug)]
pub struct MemPool {
    block_size: usize,
    threshold: usize,
    /// In-use prefix of each block is its `len()`; capacity is `block_size`.
    blocks: Vec<Vec<u8>>,
    /// Block currently bump-allocated from.
    current: usize,
    large: Vec<Box<[u8]>>,
    generation: u32,
}

impl MemPool {
    pub fn new(block_size: usize, threshold: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            threshold: threshold.clamp(1, block_size),
            blocks: Vec::new(),
            current: 0,
            large: Vec::new(),
            generation: 0,
        }
    }

    /// Allocate `size` zeroed bytes.
    pub fn alloc(&mut self, size: usize) -> PoolRef {
        if size >= self.threshold {
            let index = self.large.len() as u32;
            self.large.push(vec![0u8; size].into_boxed_slice());
            return self.make_ref(Slot::Large { index });
        }
        if let Some(block) = self.blocks.get(self.current) {
            if self.block_size - block.len() < size {
                self.current += 1;
            }
        }
        if self.current == self.blocks.len() {
            self.blocks.push(Vec::with_capacity(self.block_size));
        }
        let block = &mut self.blocks[self.current];
        let start = block.len();
        block.resize(start + size, 0);
        self.make_ref(Slot::Block {
            index: self.current as u32,
            start: start as u32,
            len: size as u32,
        })
    }

    /// Allocate a copy of `bytes`.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> PoolRef {
        let r = self.alloc(bytes.len());
        self.get_mut(r).copy_from_slice(bytes);
        r
    }

    pub fn get(&self, r: PoolRef) -> &[u8] {
        debug_assert_eq!(r.generation, self.generation, "stale mempool handle");
        match r.slot {
            Slot::Block { index, start, len } => {
                let start = start as usize;
                &self.blocks[index as usize][start..start + len as usize]
            }
            Slot::Large { index } => &self.large[index as usize],
        }
    }

    pub fn get_mut(&mut self, r: PoolRef) -> &mut [u8] {
        debug_assert_eq!(r.generation, self.generation, "stale mempool handle");
        match r.slot {
            Slot::Block { index, start, len } => {
                let start = start as usize;
                &mut self.blocks[index as usize][start..start + len as usize]
            }
            Slot::Large { index } => &mut self.large[index as usize],
        }
    }

    /// Release everything allocated so far. Oversize blocks are always freed; regular blocks are
    /// freed with `free_all`, otherwise kept and rewound for reuse.
    pub fn flush(&mut self, free_all: bool) {
        self.large.clear();
        if free_all {
            self.blocks.clear();
        } else {
            for block in &mut self.blocks {
                block.clear();
            }
        }
        self.current = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Number of regular blocks held (in use or rewound).
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn large_count(&self) -> usize {
        self.large.len()
    }

    fn make_ref(&self, slot: Slot) -> PoolRef {
        PoolRef {
            slot,
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_allocations_share_a_block() {
        let mut pool = MemPool::new(64, 32);
        let a = pool.alloc_bytes(b"Subject");
        let b = pool.alloc_bytes(b"hello");
        assert_eq!(pool.get(a), b"Subject");
        assert_eq!(pool.get(b), b"hello");
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.large_count(), 0);
    }

    #[test]
    fn exhausted_block_opens_next() {
        let mut pool = MemPool::new(16, 16);
        let a = pool.alloc_bytes(b"0123456789");
        let b = pool.alloc_bytes(b"abcdefghij");
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.get(a), b"0123456789");
        assert_eq!(pool.get(b), b"abcdefghij");
    }

    #[test]
    fn oversize_goes_to_side_list() {
        let mut pool = MemPool::new(16, 8);
        let big = pool.alloc_bytes(&[7u8; 100]);
        assert_eq!(pool.large_count(), 1);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.get(big).len(), 100);
    }

    #[test]
    fn flush_keeps_blocks_unless_free_all() {
        let mut pool = MemPool::new(16, 8);
        pool.alloc_bytes(b"abc");
        pool.alloc_bytes(&[1u8; 20]);
        pool.flush(false);
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.large_count(), 0);
        let r = pool.alloc_bytes(b"xyz");
        assert_eq!(pool.get(r), b"xyz");
        assert_eq!(pool.block_count(), 1);
        pool.flush(true);
        assert_eq!(pool.block_count(), 0);
    }

    #[test]
    fn zero_sized_allocation() {
        let mut pool = MemPool::new(16, 8);
        let r = pool.alloc_bytes(b"");
        assert!(pool.get(r).is_empty());
    }
}
