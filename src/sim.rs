//! Software model of a JEDEC SPI NOR chip, for tests.
//!
//! Programming only clears bits and is linear (no wrap at page boundaries).
//! Program and erase keep the chip busy for a couple of status polls, and
//! waking from deep power-down for one. Like a real part, anything but a
//! status read sent while busy is ignored; such commands are counted in
//! [`SimFlash::ignored_while_busy`].

use crate::define::{PAGE_SIZE, SECTOR_SIZE};
use crate::serial_interface::SerialInterface;

const CAPACITY: usize = 8 * 1024 * 1024;
const BUSY_POLLS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

pub struct SimFlash {
    mem: Vec<u8>,
    asleep: bool,
    wel: bool,
    busy_left: u32,
    stuck_busy: bool,
    write_protected: bool,
    fail_next: bool,
    ignored_while_busy: usize,
    log: Vec<Vec<u8>>,
    status_reads: usize,
    delays: usize,
    locks: usize,
    unlocks: usize,
}

impl SimFlash {
    pub fn new() -> Self {
        SimFlash {
            mem: vec![0xFF; CAPACITY],
            asleep: true,
            wel: false,
            busy_left: 0,
            stuck_busy: false,
            write_protected: false,
            fail_next: false,
            ignored_while_busy: 0,
            log: Vec::new(),
            status_reads: 0,
            delays: 0,
            locks: 0,
            unlocks: 0,
        }
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.status_reads = 0;
        self.delays = 0;
    }

    /// Every transaction except status reads, in bus order.
    pub fn transactions(&self) -> Vec<Vec<u8>> {
        self.log.iter().filter(|t| t[0] != 0x05).cloned().collect()
    }

    /// Opcode of every transaction, status reads included.
    pub fn trace(&self) -> Vec<u8> {
        self.log.iter().map(|t| t[0]).collect()
    }

    /// Opcodes of [`SimFlash::transactions`].
    pub fn commands(&self) -> Vec<u8> {
        self.transactions().iter().map(|t| t[0]).collect()
    }

    pub fn memory(&self, address: usize, len: usize) -> Vec<u8> {
        self.mem[address..address + len].to_vec()
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn is_locked(&self) -> bool {
        self.locks > self.unlocks
    }

    pub fn locks(&self) -> (usize, usize) {
        (self.locks, self.unlocks)
    }

    pub fn ignored_while_busy(&self) -> usize {
        self.ignored_while_busy
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads
    }

    pub fn delays(&self) -> usize {
        self.delays
    }

    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Ignore write enable, so WEL never latches.
    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    fn check_failure(&mut self) -> Result<(), SimError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(SimError);
        }
        Ok(())
    }

    fn address(cmd: &[u8]) -> usize {
        (cmd[1] as usize) << 16 | (cmd[2] as usize) << 8 | cmd[3] as usize
    }

    fn is_busy(&self) -> bool {
        self.stuck_busy || self.busy_left > 0
    }

    /// Count and drop a command that arrived while a program/erase/wake runs.
    fn reject_if_busy(&mut self) -> bool {
        if self.is_busy() {
            self.ignored_while_busy += 1;
            return true;
        }
        false
    }

    fn status(&mut self) -> u8 {
        self.status_reads += 1;
        let busy = self.is_busy();
        self.busy_left = self.busy_left.saturating_sub(1);
        busy as u8 | (self.wel as u8) << 1
    }

    fn execute(&mut self, cmd: &[u8]) {
        if self.asleep {
            if cmd[0] == 0xAB {
                self.asleep = false;
                self.busy_left = 1;
            }
            return;
        }
        if self.reject_if_busy() {
            return;
        }
        match cmd[0] {
            0x06 if !self.write_protected => self.wel = true,
            0x04 => self.wel = false,
            0xB9 => self.asleep = true,
            0x02 if self.wel => {
                let address = Self::address(cmd);
                let data = &cmd[4..];
                assert!(data.len() <= PAGE_SIZE, "page program over {} bytes", PAGE_SIZE);
                for (cell, byte) in self.mem[address..address + data.len()].iter_mut().zip(data) {
                    *cell &= byte;
                }
                self.finish_write();
            }
            0x20 if self.wel => {
                let base = Self::address(cmd) / SECTOR_SIZE * SECTOR_SIZE;
                self.mem[base..base + SECTOR_SIZE].fill(0xFF);
                self.finish_write();
            }
            0xC7 if self.wel => {
                self.mem.fill(0xFF);
                self.finish_write();
            }
            _ => {}
        }
    }

    fn finish_write(&mut self) {
        self.wel = false;
        self.busy_left = BUSY_POLLS;
    }
}

impl SerialInterface for SimFlash {
    type Error = SimError;

    fn write(&mut self, cmd: &[u8]) -> Result<(), SimError> {
        self.check_failure()?;
        self.log.push(cmd.to_vec());
        self.execute(cmd);
        Ok(())
    }

    fn write_and_read(&mut self, cmd: &[u8], rev: &mut [u8]) -> Result<(), SimError> {
        self.check_failure()?;
        self.log.push(cmd.to_vec());
        if self.asleep {
            // nothing drives MISO
            rev.fill(0);
            return Ok(());
        }
        if cmd[0] != 0x05 && self.reject_if_busy() {
            // output is undefined mid-operation
            rev.fill(0xFF);
            return Ok(());
        }
        match cmd[0] {
            0x05 => {
                let status = self.status();
                rev.fill(status);
            }
            0x0B => {
                assert_eq!(cmd.len(), 5, "fast read needs a dummy byte");
                let address = Self::address(cmd);
                rev.copy_from_slice(&self.mem[address..address + rev.len()]);
            }
            _ => rev.fill(0xFF),
        }
        Ok(())
    }

    fn delay(&mut self, _ms: u32) {
        self.delays += 1;
    }

    fn lock(&mut self) -> Result<(), SimError> {
        self.locks += 1;
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), SimError> {
        self.unlocks += 1;
        Ok(())
    }
}
