use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use log::warn;

use crate::define::{PAGE_SIZE, SECTOR_SIZE};
use crate::flash::Flash;
use crate::serial_interface::SerialInterface;
use crate::{FlashError, FlashOperations};

impl<E: core::fmt::Debug> NorFlashError for FlashError<E> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            FlashError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            FlashError::NotAligned | FlashError::BelowMinimumGranularity => {
                NorFlashErrorKind::NotAligned
            }
            _ => NorFlashErrorKind::Other,
        }
    }
}

/// One partition seen through the `embedded-storage` NOR flash traits.
///
/// Unlike the driver calls, ranges are not clipped: anything reaching past
/// the partition is rejected with `OutOfBounds`. Writes are split so that no
/// page program crosses a physical page boundary.
///
/// Only partitions starting on a sector boundary can be wrapped, otherwise a
/// sector erase would reach into the neighbouring partition.
pub struct PartitionStorage<'a, I, const N: usize>
where
    I: SerialInterface,
{
    flash: &'a mut Flash<I, N>,
    partition: usize,
    start: u32,
    capacity: u32,
}

impl<'a, I, const N: usize> PartitionStorage<'a, I, N>
where
    I: SerialInterface,
{
    pub fn new(flash: &'a mut Flash<I, N>, partition: usize) -> Result<Self, FlashError<I::Error>> {
        let capacity = flash.size(partition)?;
        let start = flash.partition(partition).map_or(0, |p| p.start());
        if start as usize % SECTOR_SIZE != 0 {
            warn!("partition {} at {:06X} is not sector aligned", partition, start);
            return Err(FlashError::NotAligned);
        }
        Ok(PartitionStorage {
            flash,
            partition,
            start,
            capacity,
        })
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<(), FlashError<I::Error>> {
        let end = (offset as usize).checked_add(len);
        if end.is_none_or(|end| end > self.capacity as usize) {
            warn!("{} bytes at {:06X} past end of partition {}", len, offset, self.partition);
            return Err(FlashError::OutOfBounds);
        }
        Ok(())
    }
}

impl<I, const N: usize> ErrorType for PartitionStorage<'_, I, N>
where
    I: SerialInterface,
{
    type Error = FlashError<I::Error>;
}

impl<I, const N: usize> ReadNorFlash for PartitionStorage<'_, I, N>
where
    I: SerialInterface,
{
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.check_range(offset, bytes.len())?;
        self.flash.read(self.partition, offset, bytes)?;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity as usize
    }
}

impl<I, const N: usize> NorFlash for PartitionStorage<'_, I, N>
where
    I: SerialInterface,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to {
            return Err(FlashError::OutOfBounds);
        }
        self.check_range(from, (to - from) as usize)?;
        if from as usize % SECTOR_SIZE != 0 || to as usize % SECTOR_SIZE != 0 {
            return Err(FlashError::NotAligned);
        }
        for sector in (from..to).step_by(SECTOR_SIZE) {
            self.flash.erase(self.partition, sector, SECTOR_SIZE)?;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check_range(offset, bytes.len())?;
        let mut offset = offset;
        let mut bytes = bytes;
        while !bytes.is_empty() {
            // stop at the next page boundary of the chip
            let address = (self.start + offset) as usize;
            let room = PAGE_SIZE - address % PAGE_SIZE;
            let chunk = room.min(bytes.len());
            let written = self.flash.write(self.partition, offset, &bytes[..chunk])?;
            offset += written as u32;
            bytes = &bytes[written..];
        }
        Ok(())
    }
}
