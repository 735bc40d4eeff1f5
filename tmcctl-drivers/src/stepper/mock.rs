//! Bus doubles for the chip drivers

use embedded_hal::spi::{self, Operation, SpiDevice};
use embedded_io::{ErrorKind, ErrorType, Read, Write};
use heapless::{Deque, Vec};

use super::tmc2209::crc8;

const WRITE_BIT: u8 = 0x80;
const SYNC_BYTE: u8 = 0x05;
const MASTER_ADDRESS: u8 = 0xFF;

/// Register file answering frames the way the chip pipelines them
pub(crate) struct MockSpi {
    pub(crate) regs: [u32; 128],
    pub(crate) pending: u32,
    pub(crate) frames: usize,
    pub(crate) fail: bool,
}

impl MockSpi {
    pub(crate) fn new() -> Self {
        Self {
            regs: [0; 128],
            pending: 0,
            frames: 0,
            fail: false,
        }
    }

    fn frame(&mut self, buf: &mut [u8]) {
        let write = buf[0] & WRITE_BIT != 0;
        let address = (buf[0] & 0x7F) as usize;
        let data = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);

        buf[0] = 0x01;
        buf[1..5].copy_from_slice(&self.pending.to_be_bytes());

        if write {
            self.regs[address] = data;
        }
        self.pending = self.regs[address];
        self.frames += 1;
    }
}

impl spi::ErrorType for MockSpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), spi::ErrorKind> {
        if self.fail {
            return Err(spi::ErrorKind::Other);
        }
        for op in operations {
            if let Operation::TransferInPlace(buf) = op {
                self.frame(buf);
            }
        }
        Ok(())
    }
}

/// Single-wire UART with a TMC2209 register file on the other end
pub(crate) struct MockUart {
    pub(crate) regs: [u32; 128],
    pub(crate) rx: Deque<u8, 64>,
    pub(crate) tx: Vec<u8, 8>,
    pub(crate) half_duplex: bool,
    pub(crate) corrupt_reply: bool,
    pub(crate) silent: bool,
    pub(crate) writes: usize,
}

impl MockUart {
    pub(crate) fn new(half_duplex: bool) -> Self {
        Self {
            regs: [0; 128],
            rx: Deque::new(),
            tx: Vec::new(),
            half_duplex,
            corrupt_reply: false,
            silent: false,
            writes: 0,
        }
    }

    fn datagram_complete(&mut self) {
        let reg = (self.tx[2] & 0x7F) as usize;
        if self.tx[2] & WRITE_BIT != 0 {
            self.regs[reg] = u32::from_be_bytes([self.tx[3], self.tx[4], self.tx[5], self.tx[6]]);
            self.writes += 1;
        } else if !self.silent {
            let data = self.regs[reg].to_be_bytes();
            let mut reply = [
                SYNC_BYTE,
                MASTER_ADDRESS,
                reg as u8,
                data[0],
                data[1],
                data[2],
                data[3],
                0,
            ];
            reply[7] = crc8(&reply[..7]);
            if self.corrupt_reply {
                reply[5] ^= 0x01;
            }
            for b in reply {
                self.rx.push_back(b).unwrap();
            }
        }
        self.tx.clear();
    }
}

impl ErrorType for MockUart {
    type Error = ErrorKind;
}

impl Write for MockUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        for &b in buf {
            if self.half_duplex {
                self.rx.push_back(b).unwrap();
            }
            self.tx.push(b).unwrap();
            if self.tx.len() >= 3 {
                let len = if self.tx[2] & WRITE_BIT != 0 { 8 } else { 4 };
                if self.tx.len() == len {
                    self.datagram_complete();
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl Read for MockUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}
