pub mod spi;

pub use spi::{HalSpi, SpiTransport};
