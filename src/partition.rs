use crate::define::ADDRESS_LIMIT;

/// A fixed window `[start, end)` of the chip's address space.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Partition {
    start: u32,
    end: u32,
    size: u32,
}

impl Partition {
    /// Panics at compile time when used in a const and the bounds are bad.
    pub const fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "partition start past its end");
        assert!(end as usize <= ADDRESS_LIMIT, "partition beyond 24-bit address space");
        Partition {
            start,
            end,
            size: end - start,
        }
    }

    pub const fn start(&self) -> u32 {
        self.start
    }

    pub const fn end(&self) -> u32 {
        self.end
    }

    pub const fn size(&self) -> u32 {
        self.size
    }

    pub(crate) fn derive_size(&mut self) {
        self.size = self.end - self.start;
    }

    /// Whether `addr` is a valid partition offset. `addr == size` is valid and
    /// leaves nothing to transfer.
    pub const fn contains(&self, addr: u32) -> bool {
        addr <= self.size
    }

    /// Bytes actually available for a request of `requested` bytes at `addr`.
    /// `addr` must already be known to be in bounds.
    pub fn clip(&self, addr: u32, requested: usize) -> usize {
        requested.min((self.size - addr) as usize)
    }

    /// Chip address of partition offset `addr`.
    pub const fn absolute(&self, addr: u32) -> u32 {
        self.start + addr
    }
}

#[rustfmt::skip]
mod partitions {
    use super::*;

    // Must never overlap and must fit in 24-bit addressing.
    pub const PARTITION_0:  Partition = Partition::new(0x000000, 0x004000);
    pub const PARTITION_1:  Partition = Partition::new(0x004000, 0x100000);
    pub const PARTITION_2:  Partition = Partition::new(0x100000, 0x800000);

    pub const DEFAULT_PARTITIONS: [Partition; 3] = [PARTITION_0, PARTITION_1, PARTITION_2];
}

pub use partitions::*;
