//! Platform SPI access
//!
//! On Linux the chip is reached through a spidev node; other platforms hand
//! the driver their own `embedded_hal::spi::SpiDevice` wrapped in `HalSpi`.

#[cfg(feature = "linux-hal")]
pub mod linux {
    use crate::bus::HalSpi;
    use crate::config::BusEntry;
    use crate::errors::TransportError;
    use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
    pub use linux_embedded_hal::SpidevDevice;
    use tracing::info;

    /// Open and configure the spidev node described by `bus`
    pub fn open_spidev(bus: &BusEntry) -> Result<HalSpi<SpidevDevice>, TransportError> {
        let mut device = SpidevDevice::open(&bus.path).map_err(|e| TransportError::Open {
            path: bus.path.clone(),
            reason: format!("{:?}", e),
        })?;

        let mode = match bus.mode {
            0 => SpiModeFlags::SPI_MODE_0,
            1 => SpiModeFlags::SPI_MODE_1,
            2 => SpiModeFlags::SPI_MODE_2,
            _ => SpiModeFlags::SPI_MODE_3,
        };
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(bus.speed_hz)
            .mode(mode)
            .build();
        device.0.configure(&options).map_err(|e| TransportError::Open {
            path: bus.path.clone(),
            reason: format!("configure failed: {}", e),
        })?;

        info!(
            "[spi] opened {} at {} Hz, mode {}",
            bus.path, bus.speed_hz, bus.mode
        );
        Ok(HalSpi::new(device, bus.path.clone()))
    }
}

#[cfg(feature = "linux-hal")]
pub use linux::*;
