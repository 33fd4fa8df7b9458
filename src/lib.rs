#![cfg_attr(not(test), no_std)]

use core::fmt;

pub mod config;
pub mod define;
pub mod flash;
pub mod partition;
pub mod serial_interface;
pub mod storage;

#[cfg(test)]
mod sim;

pub use config::FlashConfig;
pub use define::{PAGE_SIZE, SECTOR_SIZE};
pub use flash::Flash;
pub use partition::{DEFAULT_PARTITIONS, Partition};
pub use serial_interface::SerialInterface;
pub use storage::PartitionStorage;

/// Errors reported by the driver. `E` is the transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError<E> {
    /// Partition index past the end of the table.
    InvalidPartition,
    /// Offset past the end of the partition.
    OutOfBounds,
    /// Erase smaller than one sector once clipped to the partition.
    BelowMinimumGranularity,
    /// Offset or length not sector aligned (storage adapter only).
    NotAligned,
    /// The chip did not clear busy, or latch WEL, within the poll budget.
    Timeout,
    /// The transport failed; carries its error unchanged.
    Interface(E),
}

impl<E: fmt::Debug> fmt::Display for FlashError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashError::InvalidPartition => f.write_str("invalid partition"),
            FlashError::OutOfBounds => f.write_str("address out of partition bounds"),
            FlashError::BelowMinimumGranularity => {
                write!(f, "erase smaller than {} bytes", SECTOR_SIZE)
            }
            FlashError::NotAligned => f.write_str("request not sector aligned"),
            FlashError::Timeout => f.write_str("flash did not become ready"),
            FlashError::Interface(e) => write!(f, "serial interface error: {:?}", e),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PowerState {
    Active,
    Sleeping,
}

/// Partition-addressed flash operations.
///
/// Sizes passed in are requests: the count that comes back is what the chip
/// was actually asked to process after clipping to the partition (and, for
/// writes, to one page).
pub trait FlashOperations {
    type Error;

    fn mass_erase(&mut self) -> Result<(), Self::Error>;
    fn erase(&mut self, partition: usize, address: u32, size: usize) -> Result<usize, Self::Error>;
    fn write(&mut self, partition: usize, address: u32, data: &[u8]) -> Result<usize, Self::Error>;
    fn read(&mut self, partition: usize, address: u32, buffer: &mut [u8])
        -> Result<usize, Self::Error>;
    fn status(&mut self) -> Result<u8, Self::Error>;
    fn size(&self, partition: usize) -> Result<u32, Self::Error>;
    fn erase_size(&self, partition: usize) -> Result<u32, Self::Error>;
}
