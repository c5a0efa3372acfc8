use super::product::ProductId;
use super::registers::*;
use crate::bus::SpiTransport;
use crate::errors::DriverResult;
use tokio::time::{sleep, Duration};
use tracing::debug;

/// One register write and the settle time the chip needs afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigStep {
    pub reg: u8,
    pub value: u8,
    pub settle: Duration,
    pub what: &'static str,
}

const fn step(reg: u8, value: u8, settle_us: u64, what: &'static str) -> ConfigStep {
    ConfigStep {
        reg,
        value,
        settle: Duration::from_micros(settle_us),
        what,
    }
}

/// Ordered write sequence that resets and configures the chip for `product`
pub fn config_sequence(product: ProductId) -> [ConfigStep; 9] {
    [
        step(PWR_MGMT_1, BIT_H_RESET, 10_000, "chip reset"),
        // Wake up and clock from the gyro Z PLL
        step(PWR_MGMT_1, CLK_SEL_PLL_GYRO_Z, 1_000, "clock source"),
        // SPI only; the datasheet recommends disabling the I2C slave interface
        step(USER_CTRL, BIT_I2C_IF_DIS, 1_000, "disable I2C"),
        step(SMPLRT_DIV, SAMPLE_RATE_DIVISOR, 1_000, "sample rate"),
        step(CONFIG, BITS_DLPF_CFG_98HZ, 1_000, "low pass filter"),
        step(GYRO_CONFIG, BITS_FS_2000DPS, 1_000, "gyro range"),
        step(ACCEL_CONFIG, product.accel_config(), 1_000, "accel range"),
        step(INT_ENABLE, BIT_RAW_RDY_EN, 1_000, "data ready interrupt"),
        step(INT_PIN_CFG, BIT_INT_ANYRD_2CLEAR, 1_000, "clear interrupt on any read"),
    ]
}

/// Write the configuration sequence, stopping at the first bus failure
pub async fn configure<T: SpiTransport>(
    regs: &mut RegisterInterface<T>,
    product: ProductId,
) -> DriverResult<()> {
    for s in config_sequence(product) {
        debug!("[mpu6000] {}: reg {:#04x} <- {:#04x}", s.what, s.reg, s.value);
        regs.write8(s.reg, s.value)?;
        sleep(s.settle).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_starts_with_reset() {
        let product = ProductId::from_code(0x56).unwrap();
        let seq = config_sequence(product);
        assert_eq!((seq[0].reg, seq[0].value), (PWR_MGMT_1, BIT_H_RESET));
        assert_eq!(seq[0].settle, Duration::from_millis(10));
        assert!(seq[1..].iter().all(|s| s.settle == Duration::from_millis(1)));
    }

    #[test]
    fn test_sequence_accel_range_follows_revision() {
        let accel = |code| {
            config_sequence(ProductId::from_code(code).unwrap())
                .iter()
                .find(|s| s.reg == ACCEL_CONFIG)
                .map(|s| s.value)
        };
        assert_eq!(accel(0x54), Some(0x08));
        assert_eq!(accel(0x57), Some(0x10));
    }
}
