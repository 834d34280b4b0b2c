/*
 * options.rs
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

//! Scanner configuration.

/// Default size of one read from the source.
pub const DEFAULT_READ_SIZE: usize = 4096;
/// Default size of one header arena block.
pub const DEFAULT_POOL_BLOCK_SIZE: usize = 8192;
/// Header allocations at or above this size get their own block.
pub const DEFAULT_POOL_THRESHOLD: usize = 4096;

/// Tuning and mode switches for a [`MimeScanner`](super::MimeScanner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerOptions {
    /// Treat the input as a mailbox of messages separated by "From " lines.
    pub scan_from: bool,
    /// With `scan_from`, report content before the first separator as `PreFrom` chunks.
    pub scan_pre_from: bool,
    /// Bytes requested from the source per read. Any value from 1 up works.
    pub read_size: usize,
    pub pool_block_size: usize,
    pub pool_threshold: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            scan_from: false,
            scan_pre_from: false,
            read_size: DEFAULT_READ_SIZE,
            pool_block_size: DEFAULT_POOL_BLOCK_SIZE,
            pool_threshold: DEFAULT_POOL_THRESHOLD,
        }
    }
}

impl ScannerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scan_from(mut self, scan_from: bool) -> Self {
        self.scan_from = scan_from;
        self
    }

    pub fn with_scan_pre_from(mut self, scan_pre_from: bool) -> Self {
        self.scan_pre_from = scan_pre_from;
        self
    }

    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size.max(1);
        self
    }

    /// Arena block size and oversize threshold. The threshold is clamped to the block size.
    pub fn with_pool(mut self, block_size: usize, threshold: usize) -> Self {
        self.pool_block_size = block_size.max(1);
        self.pool_threshold = threshold.clamp(1, self.pool_block_size);
        self
    }
}
