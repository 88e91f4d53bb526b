//! Fixed-block memory partitions.
//!
//! Grounded on `original_source/kernel/pretty_memory.c`: an application
//! hands over a raw buffer plus a block count/size, and this module
//! threads a singly-linked free list through the unused blocks themselves
//! (the first `size_of::<*mut u8>()` bytes of a free block store the
//! address of the next free block). Allocation and release are O(1) and
//! never touch the heap. Partition descriptors themselves come from a
//! fixed-size pool (`CFG_MAX_MEM_PARTITIONS`), the same pool-allocation
//! shape as `core::event`'s ECBs.

use core::ptr;

use crate::config::CFG_MAX_MEM_PARTITIONS;
use crate::critical::critical_section;
use crate::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::types::PartitionId;

struct Partition {
    base: *mut u8,
    next_free: *mut u8,
    block_size: usize,
    block_count: usize,
    free_count: usize,
}

impl Partition {
    const fn new() -> Self {
        Partition { base: ptr::null_mut(), next_free: ptr::null_mut(), block_size: 0, block_count: 0, free_count: 0 }
    }
}

unsafe impl Send for Partition {}
unsafe impl Sync for Partition {}

struct PartitionPool {
    slots: [Partition; CFG_MAX_MEM_PARTITIONS],
    used: u32,
}

impl PartitionPool {
    const fn new() -> Self {
        const INIT: Partition = Partition::new();
        PartitionPool { slots: [INIT; CFG_MAX_MEM_PARTITIONS], used: 0 }
    }

    fn reset(&mut self) {
        self.slots = [Partition::new(); CFG_MAX_MEM_PARTITIONS];
        self.used = 0;
    }
}

impl Clone for Partition {
    fn clone(&self) -> Self {
        Partition {
            base: self.base,
            next_free: self.next_free,
            block_size: self.block_size,
            block_count: self.block_count,
            free_count: self.free_count,
        }
    }
}
impl Copy for Partition {}

static PARTITIONS: CsCell<PartitionPool> = CsCell::new(PartitionPool::new());

pub(crate) fn reset() {
    critical_section(|cs| PARTITIONS.get(cs).reset());
}

/// Create a fixed-block partition over `base..base + block_count *
/// block_size`. `base` must remain valid and exclusively owned by this
/// partition for as long as it exists.
///
/// # Safety
/// `base` must point to at least `block_count * block_size` writable
/// bytes, with no other live references into that range.
pub unsafe fn create(base: *mut u8, block_count: usize, block_size: usize) -> OsResult<PartitionId> {
    if base.is_null() {
        return Err(OsError::MemInvalidAddr);
    }
    if block_size < core::mem::size_of::<*mut u8>() {
        return Err(OsError::MemInvalidBlockSize);
    }
    if block_count == 0 {
        return Err(OsError::MemInvalidBlockSize);
    }

    critical_section(|cs| {
        let pool = PARTITIONS.get(cs);
        for i in 0..CFG_MAX_MEM_PARTITIONS {
            if pool.used & (1 << i) != 0 {
                continue;
            }

            unsafe {
                let mut block = base;
                for _ in 0..block_count - 1 {
                    let next = block.add(block_size);
                    (block as *mut *mut u8).write(next);
                    block = next;
                }
                (block as *mut *mut u8).write(ptr::null_mut());
            }

            pool.used |= 1 << i;
            pool.slots[i] =
                Partition { base, next_free: base, block_size, block_count, free_count: block_count };
            return Ok(PartitionId(i as u16));
        }
        Err(OsError::MemPartitionPoolEmpty)
    })
}

/// Allocate one block from the partition.
pub fn alloc(id: PartitionId) -> OsResult<*mut u8> {
    critical_section(|cs| {
        let part = &mut PARTITIONS.get(cs).slots[id.index()];
        if part.free_count == 0 {
            return Err(OsError::MemNoFreeBlocks);
        }

        let block = part.next_free;
        part.next_free = unsafe { (block as *mut *mut u8).read() };
        part.free_count -= 1;
        Ok(block)
    })
}

/// Return a block to the partition.
///
/// # Safety
/// `block` must have been obtained from [`alloc`] on this same partition
/// and not already returned.
pub unsafe fn free(id: PartitionId, block: *mut u8) -> OsResult<()> {
    if block.is_null() {
        return Err(OsError::MemInvalidAddr);
    }

    critical_section(|cs| {
        let part = &mut PARTITIONS.get(cs).slots[id.index()];
        if part.free_count >= part.block_count {
            return Err(OsError::MemFullPartition);
        }

        unsafe { (block as *mut *mut u8).write(part.next_free) };
        part.next_free = block;
        part.free_count += 1;
        Ok(())
    })
}

/// Number of free blocks remaining in the partition.
pub fn free_count(id: PartitionId) -> usize {
    critical_section(|cs| PARTITIONS.get(cs).slots[id.index()].free_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free_round_trip() {
        let mut buf = [0u8; 64];
        let id = unsafe { create(buf.as_mut_ptr(), 4, 16) }.unwrap();
        assert_eq!(free_count(id), 4);

        let b1 = alloc(id).unwrap();
        let b2 = alloc(id).unwrap();
        assert_ne!(b1, b2);
        assert_eq!(free_count(id), 2);

        unsafe { free(id, b1).unwrap() };
        assert_eq!(free_count(id), 3);
        unsafe { free(id, b2).unwrap() };
        assert_eq!(free_count(id), 4);
    }

    #[test]
    fn exhausting_partition_errors() {
        let mut buf = [0u8; 32];
        let id = unsafe { create(buf.as_mut_ptr(), 2, 16) }.unwrap();
        alloc(id).unwrap();
        alloc(id).unwrap();
        assert_eq!(alloc(id), Err(OsError::MemNoFreeBlocks));
    }
}
