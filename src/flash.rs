use log::{debug, error, info, warn};

use crate::define::{self, EraseCmd, ModeCmd, ReadCmd, Status, WriteCmd};
use crate::partition::{DEFAULT_PARTITIONS, Partition};
use crate::serial_interface::SerialInterface;
use crate::{FlashConfig, FlashError, FlashOperations, PowerState};

type Result<T, I> = core::result::Result<T, FlashError<<I as SerialInterface>::Error>>;

/// Partitioned SPI NOR flash.
///
/// Every data operation wakes the chip from deep power-down first. The
/// driver never takes the bus lock on its own: a write or erase is several
/// transactions (write enable, command, status polls, write disable), so
/// callers sharing the bus with other devices must bracket calls with
/// [`Flash::lock`]/[`Flash::unlock`] or use [`Flash::locked`].
pub struct Flash<I, const N: usize>
where
    I: SerialInterface,
{
    interface: I,
    partitions: [Partition; N],
    config: FlashConfig,
    state: PowerState,
}

impl<I> Flash<I, 3>
where
    I: SerialInterface,
{
    pub fn with_default_partitions(interface: I) -> Self {
        Flash::new(interface, DEFAULT_PARTITIONS, FlashConfig::default())
    }
}

impl<I, const N: usize> Flash<I, N>
where
    I: SerialInterface,
{
    /// The chip is assumed to be in deep power-down until [`Flash::init`].
    pub fn new(interface: I, partitions: [Partition; N], config: FlashConfig) -> Self {
        Flash {
            interface,
            partitions,
            config,
            state: PowerState::Sleeping,
        }
    }

    pub fn init(&mut self) -> Result<(), I> {
        self.resume()?;
        for partition in self.partitions.iter_mut() {
            partition.derive_size();
        }
        info!("flash ready, {} partitions", N);
        for (i, p) in self.partitions.iter().enumerate() {
            debug!("partition {}: {:06X}..{:06X} ({} bytes)", i, p.start(), p.end(), p.size());
        }
        Ok(())
    }

    /// Put the chip into deep power-down. The command is sent even when the
    /// driver already believes the chip is asleep.
    pub fn suspend(&mut self) -> Result<(), I> {
        self.wait_busy()?;
        self.command(ModeCmd::PowerDown as u8)?;
        self.state = PowerState::Sleeping;
        info!("flash suspended");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), I> {
        if self.state == PowerState::Active {
            return Ok(());
        }
        self.command(ModeCmd::ReleasePowerDown as u8)?;
        self.wait_busy()?;
        self.state = PowerState::Active;
        info!("flash resumed");
        Ok(())
    }

    pub fn power_state(&self) -> PowerState {
        self.state
    }

    pub fn wait_busy(&mut self) -> Result<(), I> {
        self.poll_status(|status| !Status::Busy.is_set(status), "busy clear")
    }

    pub fn wait_wel(&mut self) -> Result<(), I> {
        self.poll_status(|status| Status::Wel.is_set(status), "write enable latch")
    }

    pub fn lock(&mut self) -> Result<(), I> {
        self.interface.lock().map_err(FlashError::Interface)
    }

    pub fn unlock(&mut self) -> Result<(), I> {
        self.interface.unlock().map_err(FlashError::Interface)
    }

    /// Run `operation` between [`Flash::lock`] and [`Flash::unlock`]. The bus
    /// is unlocked even when `operation` fails.
    pub fn locked<T, F>(&mut self, operation: F) -> Result<T, I>
    where
        F: FnOnce(&mut Self) -> Result<T, I>,
    {
        self.lock()?;
        let ret = operation(self);
        let unlocked = self.unlock();
        let value = ret?;
        unlocked?;
        Ok(value)
    }

    pub fn partition(&self, partition: usize) -> Option<&Partition> {
        self.partitions.get(partition)
    }

    pub fn partitions(&self) -> &[Partition; N] {
        &self.partitions
    }

    /// Give the transport back.
    pub fn release(self) -> I {
        self.interface
    }

    fn poll_status<F: Fn(u8) -> bool>(&mut self, ready: F, what: &str) -> Result<(), I> {
        for poll in 0..self.config.max_polls {
            if poll > 0 && self.config.poll_delay_ms > 0 {
                self.interface.delay(self.config.poll_delay_ms);
            }
            if ready(self.status()?) {
                return Ok(());
            }
        }
        error!("timed out waiting for {} after {} polls", what, self.config.max_polls);
        Err(FlashError::Timeout)
    }

    fn command(&mut self, cmd: u8) -> Result<(), I> {
        self.transfer(&[cmd])
    }

    fn transfer(&mut self, cmd: &[u8]) -> Result<(), I> {
        self.interface.write(cmd).map_err(|e| {
            error!("failed to send command {:02X}", cmd[0]);
            FlashError::Interface(e)
        })
    }

    /// Look up `partition` and check that `address` lies inside it.
    fn checked(&self, partition: usize, address: u32) -> Result<Partition, I> {
        let Some(p) = self.partitions.get(partition) else {
            warn!("invalid partition {}", partition);
            return Err(FlashError::InvalidPartition);
        };
        if !p.contains(address) {
            warn!("address {:06X} past end of partition {}", address, partition);
            return Err(FlashError::OutOfBounds);
        }
        Ok(*p)
    }

    /// Write enable, `operation`, write disable, with the busy/WEL waits in
    /// between. The chip must already be awake.
    fn write_operation<F>(&mut self, operation: F) -> Result<(), I>
    where
        F: FnOnce(&mut Self) -> Result<(), I>,
    {
        self.wait_busy()?;
        self.command(WriteCmd::WriteEnable as u8)?;
        self.wait_wel()?;
        operation(self)?;
        self.wait_busy()?;
        self.command(WriteCmd::WriteDisable as u8)?;
        self.wait_busy()
    }
}

impl<I, const N: usize> FlashOperations for Flash<I, N>
where
    I: SerialInterface,
{
    type Error = FlashError<I::Error>;

    fn mass_erase(&mut self) -> Result<(), I> {
        self.resume()?;
        info!("erasing whole chip");
        self.write_operation(|s| s.command(EraseCmd::Chip as u8))
    }

    fn erase(&mut self, partition: usize, address: u32, size: usize) -> Result<usize, I> {
        let p = self.checked(partition, address)?;
        let size = p.clip(address, size);
        if size < define::SECTOR_SIZE {
            warn!("erase of {} bytes below sector size", size);
            return Err(FlashError::BelowMinimumGranularity);
        }
        self.resume()?;
        debug!("erase p{} {:06X} +{}", partition, address, size);
        let cmd = define::command_and_address(EraseCmd::Sector4K as u8, p.absolute(address));
        self.write_operation(|s| s.transfer(&cmd))?;
        Ok(size)
    }

    /// At most one page is programmed per call; the count returned tells the
    /// caller where to continue.
    fn write(&mut self, partition: usize, address: u32, data: &[u8]) -> Result<usize, I> {
        let p = self.checked(partition, address)?;
        self.resume()?;
        let size = p.clip(address, data.len()).min(define::PAGE_SIZE);
        debug!("write p{} {:06X} +{}", partition, address, size);

        let mut cmd = [0u8; 4 + define::PAGE_SIZE];
        cmd[..4].copy_from_slice(&define::command_and_address(
            WriteCmd::PageProgram as u8,
            p.absolute(address),
        ));
        cmd[4..4 + size].copy_from_slice(&data[..size]);
        self.write_operation(|s| s.transfer(&cmd[..4 + size]))?;
        Ok(size)
    }

    fn read(&mut self, partition: usize, address: u32, buffer: &mut [u8]) -> Result<usize, I> {
        let p = self.checked(partition, address)?;
        self.resume()?;
        let size = p.clip(address, buffer.len());
        debug!("read p{} {:06X} +{}", partition, address, size);

        self.wait_busy()?;
        let addr = define::command_and_address(ReadCmd::Fast as u8, p.absolute(address));
        let cmd = [addr[0], addr[1], addr[2], addr[3], define::DUMMY];
        self.interface
            .write_and_read(&cmd, &mut buffer[..size])
            .map_err(|e| {
                error!("failed to read {} bytes at {:06X}", size, p.absolute(address));
                FlashError::Interface(e)
            })?;
        Ok(size)
    }

    /// Raw status register 1: bit 0 busy, bit 1 write enable latch.
    fn status(&mut self) -> Result<u8, I> {
        let cmd = [ReadCmd::Status1 as u8];
        let mut status = [0u8; 1];
        self.interface
            .write_and_read(&cmd, &mut status)
            .map_err(|e| {
                error!("failed to read status register");
                FlashError::Interface(e)
            })?;
        Ok(status[0])
    }

    fn size(&self, partition: usize) -> Result<u32, I> {
        self.partitions
            .get(partition)
            .map(Partition::size)
            .ok_or(FlashError::InvalidPartition)
    }

    fn erase_size(&self, partition: usize) -> Result<u32, I> {
        self.size(partition).map(|_| define::SECTOR_SIZE as u32)
    }
}
