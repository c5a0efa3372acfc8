use super::registers::{RegisterInterface, BITS_AFS_SEL_1, BITS_AFS_SEL_2, PRODUCT_ID};
use crate::bus::SpiTransport;
use crate::errors::{DriverError, DriverResult};
use tracing::{debug, info};

// Product ID: high nibble product name, low nibble silicon revision
const MPU6000ES_REV_C4: u8 = 0x14;
const MPU6000ES_REV_C5: u8 = 0x15;
const MPU6000ES_REV_D6: u8 = 0x16;
const MPU6000ES_REV_D7: u8 = 0x17;
const MPU6000ES_REV_D8: u8 = 0x18;
const MPU6000_REV_C4: u8 = 0x54;
const MPU6000_REV_C5: u8 = 0x55;
const MPU6000_REV_D6: u8 = 0x56;
const MPU6000_REV_D7: u8 = 0x57;
const MPU6000_REV_D8: u8 = 0x58;
const MPU6000_REV_D9: u8 = 0x59;
const MPU6000_REV_D10: u8 = 0x5A;

/// Every product code the driver accepts
pub const KNOWN_PRODUCT_IDS: [u8; 12] = [
    MPU6000ES_REV_C4,
    MPU6000ES_REV_C5,
    MPU6000ES_REV_D6,
    MPU6000ES_REV_D7,
    MPU6000ES_REV_D8,
    MPU6000_REV_C4,
    MPU6000_REV_C5,
    MPU6000_REV_D6,
    MPU6000_REV_D7,
    MPU6000_REV_D8,
    MPU6000_REV_D9,
    MPU6000_REV_D10,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLine {
    EngineeringSample,
    Production,
}

/// Silicon revision family; selects the accelerometer range encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiliconRevision {
    C,
    D,
}

/// A product code that passed the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductId(u8);

impl ProductId {
    pub fn from_code(code: u8) -> DriverResult<Self> {
        if KNOWN_PRODUCT_IDS.contains(&code) {
            Ok(Self(code))
        } else {
            Err(DriverError::UnknownProduct { id: code })
        }
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn line(&self) -> ProductLine {
        if self.0 & 0xF0 == 0x10 {
            ProductLine::EngineeringSample
        } else {
            ProductLine::Production
        }
    }

    pub fn revision(&self) -> SiliconRevision {
        match self.0 {
            MPU6000ES_REV_C4 | MPU6000ES_REV_C5 | MPU6000_REV_C4 | MPU6000_REV_C5 => {
                SiliconRevision::C
            }
            _ => SiliconRevision::D,
        }
    }

    /// ACCEL_CONFIG value for ±8 g (4096 LSB/g).
    ///
    /// Rev C parts have half the accelerometer sensitivity of rev D, so the
    /// same physical range needs a smaller AFS_SEL.
    pub fn accel_config(&self) -> u8 {
        match self.revision() {
            SiliconRevision::C => BITS_AFS_SEL_1,
            SiliconRevision::D => BITS_AFS_SEL_2,
        }
    }
}

/// Read the product register once and check it against the known codes
pub fn probe<T: SpiTransport>(regs: &mut RegisterInterface<T>) -> DriverResult<ProductId> {
    let code = regs.read8(PRODUCT_ID)?;
    match ProductId::from_code(code) {
        Ok(product) => {
            info!(
                "[mpu6000] ID {:#04x} ({:?}, rev {:?})",
                code,
                product.line(),
                product.revision()
            );
            Ok(product)
        }
        Err(e) => {
            debug!("[mpu6000] unexpected ID {:#04x}", code);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_code_is_accepted() {
        for code in KNOWN_PRODUCT_IDS {
            let product = ProductId::from_code(code).unwrap();
            assert_eq!(product.code(), code);
        }
    }

    #[test]
    fn test_unknown_codes_are_rejected() {
        for code in [0x00, 0x13, 0x19, 0x53, 0x5B, 0x68, 0xFF] {
            assert_eq!(
                ProductId::from_code(code),
                Err(DriverError::UnknownProduct { id: code })
            );
        }
    }

    #[test]
    fn test_revision_family_selects_accel_config() {
        for code in [0x14, 0x15, 0x54, 0x55] {
            let product = ProductId::from_code(code).unwrap();
            assert_eq!(product.revision(), SiliconRevision::C);
            assert_eq!(product.accel_config(), 0x08);
        }
        for code in [0x16, 0x17, 0x18, 0x56, 0x57, 0x58, 0x59, 0x5A] {
            let product = ProductId::from_code(code).unwrap();
            assert_eq!(product.revision(), SiliconRevision::D);
            assert_eq!(product.accel_config(), 0x10);
        }
    }

    #[test]
    fn test_product_line() {
        assert_eq!(
            ProductId::from_code(0x16).unwrap().line(),
            ProductLine::EngineeringSample
        );
        assert_eq!(
            ProductId::from_code(0x5A).unwrap().line(),
            ProductLine::Production
        );
    }
}
