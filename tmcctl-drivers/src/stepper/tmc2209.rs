//! TMC2209 stepper driver (UART mode)
//!
//! # UART Protocol
//!
//! The TMC2209 uses a single-wire UART protocol at 115200 baud (8N1):
//! - Sync byte: 0x05
//! - Slave address (MS1/MS2 pins set the address 0-3)
//! - Register address + R/W bit
//! - Data (4 bytes, big-endian, writes only)
//! - CRC8
//!
//! When TX and RX share one wire every byte sent is echoed back and has
//! to be discarded before the reply.
//!
//! IHOLD_IRUN, TPWMTHRS, TCOOLTHRS and SGTHRS are write-only; this
//! driver keeps shadow copies to answer reads of them.

use core::ops::RangeInclusive;

use embedded_io::{Read, ReadExactError, Write};
use tmcctl_core::traits::{ChipError, ChipFamily, ThermalStatus, TmcChip};

use super::current::{ihold_irun, irun_of, CurrentSetting};
use super::registers::{self, DrvStatus, CHOPCONF_VSENSE, TCOOLTHRS_ALWAYS};

/// TMC2209 Register addresses
pub mod reg {
    /// General configuration
    pub const GCONF: u8 = 0x00;
    /// Global status flags
    pub const GSTAT: u8 = 0x01;
    /// Interface transmission counter
    pub const IFCNT: u8 = 0x02;
    /// Hold/run current settings
    pub const IHOLD_IRUN: u8 = 0x10;
    /// Power down delay
    pub const TPOWERDOWN: u8 = 0x11;
    /// Upper velocity for StealthChop
    pub const TPWMTHRS: u8 = 0x13;
    /// Lower velocity for CoolStep/StallGuard
    pub const TCOOLTHRS: u8 = 0x14;
    /// StallGuard threshold
    pub const SGTHRS: u8 = 0x40;
    /// Chopper configuration
    pub const CHOPCONF: u8 = 0x6C;
    /// Driver status
    pub const DRV_STATUS: u8 = 0x6F;
    /// StealthChop PWM configuration
    pub const PWMCONF: u8 = 0x70;
}

/// UART sync byte for TMC2209
const SYNC_BYTE: u8 = 0x05;
/// Address the chip puts in its replies
const MASTER_ADDRESS: u8 = 0xFF;
const WRITE_BIT: u8 = 0x80;

/// GCONF: spreadCycle instead of stealthChop
const GCONF_EN_SPREADCYCLE: u32 = 1 << 2;
/// GCONF: PDN_UART is used for UART only
const GCONF_PDN_DISABLE: u32 = 1 << 6;
/// GCONF: microsteps come from MRES, not MS1/MS2
const GCONF_MSTEP_REG_SELECT: u32 = 1 << 7;
/// GCONF: filter step pulses
const GCONF_MULTISTEP_FILT: u32 = 1 << 8;

/// Delay before dropping to hold current
const HOLD_DELAY: u8 = 6;

/// CRC8 calculation for TMC2209 UART
///
/// Uses polynomial 0x07 (x^8 + x^2 + x + 1), LSB of each byte first.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut current = byte;
        for _ in 0..8 {
            if ((crc >> 7) ^ (current & 0x01)) != 0 {
                crc = (crc << 1) ^ 0x07;
            } else {
                crc <<= 1;
            }
            current >>= 1;
        }
    }
    crc
}

/// Build a write datagram
pub fn build_write_datagram(addr: u8, reg: u8, data: u32) -> [u8; 8] {
    let bytes = data.to_be_bytes();
    let mut datagram = [
        SYNC_BYTE,
        addr,
        reg | WRITE_BIT,
        bytes[0],
        bytes[1],
        bytes[2],
        bytes[3],
        0,
    ];
    datagram[7] = crc8(&datagram[..7]);
    datagram
}

/// Build a read request datagram
pub fn build_read_request(addr: u8, reg: u8) -> [u8; 4] {
    let mut datagram = [SYNC_BYTE, addr, reg, 0];
    datagram[3] = crc8(&datagram[..3]);
    datagram
}

/// Parse a read response for `reg`
///
/// The TMC2209 responds with:
/// - Sync (0x05)
/// - Master address (0xFF)
/// - Register address
/// - 4 bytes data (big-endian)
/// - CRC8
pub fn parse_read_response(response: &[u8; 8], reg: u8) -> Result<u32, ChipError> {
    if response[0] != SYNC_BYTE || response[1] != MASTER_ADDRESS || response[2] != reg {
        return Err(ChipError::InvalidSync);
    }
    if response[7] != crc8(&response[..7]) {
        return Err(ChipError::CrcMismatch);
    }
    Ok(u32::from_be_bytes([
        response[3],
        response[4],
        response[5],
        response[6],
    ]))
}

/// TMC2209 driver on a UART
pub struct Tmc2209<U> {
    uart: U,
    address: u8,
    rsense: f32,
    half_duplex: bool,
    stealthchop: bool,
    ihold_irun: u32,
    tpwmthrs: u32,
    tcoolthrs: u32,
    sgthrs: u8,
}

impl<U: Read + Write> Tmc2209<U> {
    /// Create a driver
    ///
    /// `address` is the MS1/MS2 slave address, `rsense` the sense
    /// resistor in ohms, `half_duplex` whether TX echoes onto RX.
    pub fn new(uart: U, address: u8, rsense: f32, half_duplex: bool) -> Self {
        Self {
            uart,
            address,
            rsense,
            half_duplex,
            stealthchop: true,
            ihold_irun: 0,
            tpwmthrs: 0,
            tcoolthrs: 0,
            sgthrs: 0,
        }
    }

    /// Program the base configuration
    pub fn init(&mut self, microsteps: u16, stealthchop: bool) -> Result<(), ChipError> {
        self.stealthchop = stealthchop;

        self.write_register(reg::GCONF, self.gconf(false))?;
        self.write_register(reg::CHOPCONF, registers::chopconf(microsteps))?;
        self.write_register(reg::TPOWERDOWN, 20)?;
        // PWM_OFS = 36, PWM_GRAD = 14, PWM_FREQ = 1, autoscale, autograd,
        // PWM_REG = 4, PWM_LIM = 12
        let pwmconf = 36 | (14 << 8) | (1 << 16) | (1 << 18) | (1 << 19) | (4 << 24) | (12 << 28);
        self.write_register(reg::PWMCONF, pwmconf)?;
        self.write_register(reg::GSTAT, 0b111)?;
        Ok(())
    }

    /// Slave address
    pub fn address(&self) -> u8 {
        self.address
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Release the UART
    pub fn release(self) -> U {
        self.uart
    }

    /// Write a register
    pub fn write_register(&mut self, reg: u8, value: u32) -> Result<(), ChipError> {
        let datagram = build_write_datagram(self.address, reg, value);
        self.send(&datagram)?;
        match reg {
            reg::IHOLD_IRUN => self.ihold_irun = value,
            reg::TPWMTHRS => self.tpwmthrs = value,
            reg::TCOOLTHRS => self.tcoolthrs = value,
            reg::SGTHRS => self.sgthrs = value as u8,
            _ => {}
        }
        Ok(())
    }

    /// Read a register
    pub fn read_register(&mut self, reg: u8) -> Result<u32, ChipError> {
        let request = build_read_request(self.address, reg);
        self.send(&request)?;

        let mut response = [0u8; 8];
        self.receive(&mut response)?;
        parse_read_response(&response, reg)
    }

    /// Parsed DRV_STATUS
    pub fn drv_status(&mut self) -> Result<DrvStatus, ChipError> {
        Ok(DrvStatus::from_tmc2209(self.read_register(reg::DRV_STATUS)?))
    }

    /// Last value written to TCOOLTHRS
    pub fn tcoolthrs(&self) -> u32 {
        self.tcoolthrs
    }

    fn gconf(&self, stall_detection: bool) -> u32 {
        let mut gconf = GCONF_PDN_DISABLE | GCONF_MSTEP_REG_SELECT | GCONF_MULTISTEP_FILT;
        // StallGuard4 only works in stealthChop
        if !self.stealthchop && !stall_detection {
            gconf |= GCONF_EN_SPREADCYCLE;
        }
        gconf
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), ChipError> {
        self.uart.write_all(datagram).map_err(|_| ChipError::Bus)?;
        self.uart.flush().map_err(|_| ChipError::Bus)?;

        if self.half_duplex {
            let mut echo = [0u8; 8];
            self.receive(&mut echo[..datagram.len()])?;
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<(), ChipError> {
        self.uart.read_exact(buf).map_err(|e| match e {
            ReadExactError::UnexpectedEof => ChipError::Timeout,
            ReadExactError::Other(_) => ChipError::Bus,
        })
    }
}

impl<U: Read + Write> TmcChip for Tmc2209<U> {
    fn family(&self) -> ChipFamily {
        ChipFamily::Uart
    }

    fn sensitivity_range(&self) -> RangeInclusive<i16> {
        0..=255
    }

    fn rms_current(&mut self) -> Result<u16, ChipError> {
        let vsense = self.read_register(reg::CHOPCONF)? & CHOPCONF_VSENSE != 0;
        Ok(CurrentSetting::to_rms(
            irun_of(self.ihold_irun),
            vsense,
            self.rsense,
        ))
    }

    fn set_rms_current_with_hold(
        &mut self,
        ma: u16,
        hold_multiplier: f32,
    ) -> Result<(), ChipError> {
        let setting = CurrentSetting::from_rms(ma, hold_multiplier, self.rsense);
        let chopconf = self.read_register(reg::CHOPCONF)? & !CHOPCONF_VSENSE;
        let vsense = if setting.vsense { CHOPCONF_VSENSE } else { 0 };
        self.write_register(reg::CHOPCONF, chopconf | vsense)?;
        self.write_register(reg::IHOLD_IRUN, ihold_irun(setting, HOLD_DELAY))
    }

    fn microsteps(&mut self) -> Result<u16, ChipError> {
        Ok(registers::microsteps_of(self.read_register(reg::CHOPCONF)?))
    }

    fn tpwmthrs(&mut self) -> Result<u32, ChipError> {
        Ok(self.tpwmthrs)
    }

    fn set_tpwmthrs(&mut self, value: u32) -> Result<(), ChipError> {
        self.write_register(reg::TPWMTHRS, registers::tpwmthrs(value))
    }

    fn sensitivity(&mut self) -> Result<i16, ChipError> {
        Ok(self.sgthrs as i16)
    }

    fn set_sensitivity(&mut self, value: i16) -> Result<(), ChipError> {
        self.write_register(reg::SGTHRS, value as u32 & 0xFF)
    }

    fn thermal_status(&mut self) -> Result<ThermalStatus, ChipError> {
        Ok(self.drv_status()?.thermal())
    }

    fn set_stall_detection(&mut self, enable: bool) -> Result<(), ChipError> {
        self.write_register(reg::GCONF, self.gconf(enable))?;
        self.write_register(reg::TCOOLTHRS, if enable { TCOOLTHRS_ALWAYS } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::mock::MockUart;

    fn driver(half_duplex: bool) -> Tmc2209<MockUart> {
        let mut drv = Tmc2209::new(MockUart::new(half_duplex), 0, 0.11, half_duplex);
        drv.init(16, true).unwrap();
        drv
    }

    #[test]
    fn test_crc8_known_value() {
        assert_eq!(crc8(&[]), 0);
        assert_eq!(build_read_request(0, reg::IFCNT), [0x05, 0x00, 0x02, 0x8F]);
    }

    #[test]
    fn test_write_datagram() {
        let datagram = build_write_datagram(0, reg::GCONF, 0x0000_0140);

        assert_eq!(datagram[0], SYNC_BYTE);
        assert_eq!(datagram[1], 0);
        assert_eq!(datagram[2], reg::GCONF | WRITE_BIT);
        assert_eq!(&datagram[3..7], &[0x00, 0x00, 0x01, 0x40]);
        assert_eq!(datagram[7], crc8(&datagram[..7]));
    }

    #[test]
    fn test_parse_read_response() {
        let mut response = [SYNC_BYTE, MASTER_ADDRESS, reg::DRV_STATUS, 0x12, 0x34, 0x56, 0x78, 0];
        response[7] = crc8(&response[..7]);
        assert_eq!(parse_read_response(&response, reg::DRV_STATUS), Ok(0x1234_5678));

        let mut bad_sync = response;
        bad_sync[0] = 0x00;
        assert_eq!(
            parse_read_response(&bad_sync, reg::DRV_STATUS),
            Err(ChipError::InvalidSync)
        );

        assert_eq!(
            parse_read_response(&response, reg::CHOPCONF),
            Err(ChipError::InvalidSync)
        );

        let mut bad_crc = response;
        bad_crc[7] ^= 0xFF;
        assert_eq!(
            parse_read_response(&bad_crc, reg::DRV_STATUS),
            Err(ChipError::CrcMismatch)
        );
    }

    #[test]
    fn test_init_selects_stealthchop() {
        let drv = driver(false);
        let gconf = drv.uart.regs[reg::GCONF as usize];
        assert_eq!(gconf & GCONF_EN_SPREADCYCLE, 0);
        assert_ne!(gconf & GCONF_PDN_DISABLE, 0);
        assert_eq!(drv.uart.writes, 5);
    }

    #[test]
    fn test_half_duplex_echo_discarded() {
        let mut drv = driver(true);
        assert_eq!(drv.microsteps(), Ok(16));
        drv.set_tpwmthrs(98).unwrap();
        assert_eq!(drv.microsteps(), Ok(16));
        assert!(drv.uart.rx.is_empty());
    }

    #[test]
    fn test_current_round_trip() {
        let mut drv = driver(false);
        drv.set_rms_current(800).unwrap();

        let ihold_irun = drv.uart.regs[reg::IHOLD_IRUN as usize];
        assert_eq!(irun_of(ihold_irun), 25);
        assert_eq!(drv.microsteps(), Ok(16));

        let back = drv.rms_current().unwrap();
        assert!((760..=800).contains(&back), "{}", back);
    }

    #[test]
    fn test_threshold_wider_than_field_saturates() {
        let mut drv = driver(true);
        drv.set_tpwmthrs(3_162_500).unwrap();
        assert_eq!(drv.uart.regs[reg::TPWMTHRS as usize], 0xFFFFF);
        assert_eq!(drv.tpwmthrs(), Ok(0xFFFFF));

        drv.set_tpwmthrs(98).unwrap();
        assert_eq!(drv.uart.regs[reg::TPWMTHRS as usize], 98);
    }

    #[test]
    fn test_sgthrs() {
        let mut drv = driver(false);
        drv.set_sensitivity(200).unwrap();
        assert_eq!(drv.uart.regs[reg::SGTHRS as usize], 200);
        assert_eq!(drv.sensitivity(), Ok(200));
    }

    #[test]
    fn test_thermal_status() {
        let mut drv = driver(true);
        drv.uart.regs[reg::DRV_STATUS as usize] = 0b01;
        assert_eq!(
            drv.thermal_status(),
            Ok(ThermalStatus {
                prewarning: true,
                shutdown: false
            })
        );
    }

    #[test]
    fn test_stall_detection() {
        let mut drv = Tmc2209::new(MockUart::new(false), 0, 0.11, false);
        drv.init(16, false).unwrap();
        assert_ne!(drv.uart.regs[reg::GCONF as usize] & GCONF_EN_SPREADCYCLE, 0);

        drv.set_stall_detection(true).unwrap();
        assert_eq!(drv.uart.regs[reg::GCONF as usize] & GCONF_EN_SPREADCYCLE, 0);
        assert_eq!(drv.tcoolthrs(), TCOOLTHRS_ALWAYS);

        drv.set_stall_detection(false).unwrap();
        assert_ne!(drv.uart.regs[reg::GCONF as usize] & GCONF_EN_SPREADCYCLE, 0);
        assert_eq!(drv.tcoolthrs(), 0);
    }

    #[test]
    fn test_corrupt_reply() {
        let mut drv = driver(false);
        drv.uart.corrupt_reply = true;
        assert_eq!(drv.microsteps(), Err(ChipError::CrcMismatch));
    }

    #[test]
    fn test_no_reply_times_out() {
        let mut drv = driver(false);
        drv.uart.silent = true;
        assert_eq!(drv.thermal_status(), Err(ChipError::Timeout));
    }
}
