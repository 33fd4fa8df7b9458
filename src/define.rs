/// Maximum payload of a single page program command.
pub const PAGE_SIZE: usize = 256;

/// Smallest erasable unit (sector erase).
pub const SECTOR_SIZE: usize = 4096;

/// Commands are addressed with 3 bytes, so nothing above 16 MiB is reachable.
pub const ADDRESS_LIMIT: usize = 1 << 24;

/// Dummy byte clocked out after the address of a fast read.
pub(crate) const DUMMY: u8 = 0xFF;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteCmd {
    WriteEnable = 0x06,
    WriteDisable = 0x04,
    PageProgram = 0x02,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadCmd {
    Status1 = 0x05,
    Fast = 0x0B,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModeCmd {
    PowerDown = 0xB9,
    ReleasePowerDown = 0xAB,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EraseCmd {
    Sector4K = 0x20,
    Chip = 0xC7, // C7h|60h
}

pub(crate) enum Status {
    Busy = 0b0000_0001,
    Wel = 0b0000_0010,
}

impl Status {
    pub(crate) const fn is_set(self, status: u8) -> bool {
        status & self as u8 != 0
    }
}

/// Opcode followed by a big-endian 24-bit address.
pub(crate) fn command_and_address(cmd: u8, address: u32) -> [u8; 4] {
    [cmd, (address >> 16) as u8, (address >> 8) as u8, address as u8]
}
