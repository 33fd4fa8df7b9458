use core::fmt::Debug;

/// Byte transport to a single flash chip.
///
/// An implementation is bound to one chip select. Each call to `write` or
/// `write_and_read` is one transaction: chip select is asserted before the
/// first byte and released after the last one.
pub trait SerialInterface {
    type Error: Debug;

    /// Clock out `cmd` and ignore whatever comes back.
    fn write(&mut self, cmd: &[u8]) -> Result<(), Self::Error>;

    /// Clock out `cmd`, then clock `rev.len()` bytes in, in the same transaction.
    fn write_and_read(&mut self, cmd: &[u8], rev: &mut [u8]) -> Result<(), Self::Error>;

    fn delay(&mut self, ms: u32);

    /// Take exclusive ownership of the bus for a sequence of transactions.
    ///
    /// Transports on a dedicated bus can leave the default no-op.
    fn lock(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

