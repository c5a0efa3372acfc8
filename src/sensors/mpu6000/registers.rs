//! MPU-6000 register map and the SPI register access layer.

use crate::bus::SpiTransport;
use crate::errors::TransportError;

/// Direction flag carried in the address byte
pub const DIR_READ: u8 = 0x80;
pub const DIR_WRITE: u8 = 0x00;

// Register addresses for the MPU-6000
pub const PRODUCT_ID: u8 = 0x0C;
pub const SMPLRT_DIV: u8 = 0x19;
pub const CONFIG: u8 = 0x1A;
pub const GYRO_CONFIG: u8 = 0x1B;
pub const ACCEL_CONFIG: u8 = 0x1C;
pub const INT_PIN_CFG: u8 = 0x37;
pub const INT_ENABLE: u8 = 0x38;
pub const INT_STATUS: u8 = 0x3A;
pub const TEMP_OUT_H: u8 = 0x41;
pub const USER_CTRL: u8 = 0x6A;
pub const PWR_MGMT_1: u8 = 0x6B;
pub const WHO_AM_I: u8 = 0x75;

// PWR_MGMT_1
pub const BIT_H_RESET: u8 = 0x80;
pub const CLK_SEL_PLL_GYRO_Z: u8 = 0x03;

// USER_CTRL
pub const BIT_I2C_IF_DIS: u8 = 0x10;

// CONFIG
pub const BITS_DLPF_CFG_98HZ: u8 = 0x02;

// GYRO_CONFIG
pub const BITS_FS_2000DPS: u8 = 0x18;

// ACCEL_CONFIG, AFS_SEL field in bits 4:3
pub const BITS_AFS_SEL_1: u8 = 1 << 3;
pub const BITS_AFS_SEL_2: u8 = 2 << 3;

// INT_ENABLE / INT_PIN_CFG
pub const BIT_RAW_RDY_EN: u8 = 0x01;
pub const BIT_INT_ANYRD_2CLEAR: u8 = 0x10;

/// 1 kHz internal rate / (4 + 1) = 200 Hz output
pub const SAMPLE_RATE_DIVISOR: u8 = 0x04;

/// Status byte plus 3 accel, 1 temperature and 3 gyro words
pub const BURST_LEN: usize = 1 + 7 * 2;

/// Synchronous register reads and writes over an SPI transport
pub struct RegisterInterface<T> {
    spi: T,
}

impl<T: SpiTransport> RegisterInterface<T> {
    pub fn new(spi: T) -> Self {
        Self { spi }
    }

    pub fn read8(&mut self, reg: u8) -> Result<u8, TransportError> {
        let mut cmd = [reg | DIR_READ, 0];
        self.spi.transfer(&mut cmd)?;
        Ok(cmd[1])
    }

    /// Read a 16-bit register pair, high byte first on the wire
    pub fn read16(&mut self, reg: u8) -> Result<u16, TransportError> {
        let mut cmd = [reg | DIR_READ, 0, 0];
        self.spi.transfer(&mut cmd)?;
        Ok(u16::from_be_bytes([cmd[1], cmd[2]]))
    }

    pub fn write8(&mut self, reg: u8, value: u8) -> Result<(), TransportError> {
        let mut cmd = [reg | DIR_WRITE, value];
        self.spi.transfer(&mut cmd)
    }

    /// Read-modify-write: `clear` bits are cleared before `set` bits are set
    pub fn modify(&mut self, reg: u8, clear: u8, set: u8) -> Result<(), TransportError> {
        let value = self.read8(reg)?;
        self.write8(reg, (value & !clear) | set)
    }

    /// Read `out.len()` consecutive registers starting at `start` in one exchange
    pub fn read_burst(&mut self, start: u8, out: &mut [u8]) -> Result<(), TransportError> {
        let mut buf = vec![0u8; out.len() + 1];
        buf[0] = start | DIR_READ;
        self.spi.transfer(&mut buf)?;
        out.copy_from_slice(&buf[1..]);
        Ok(())
    }

    /// Consume the interface and return the transport
    pub fn release(self) -> T {
        self.spi
    }
}
