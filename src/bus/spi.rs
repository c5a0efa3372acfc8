use crate::errors::TransportError;
use embedded_hal::spi::{Error as _, SpiDevice};

/// Full-duplex, fixed-length, blocking exchange with one chip-selected device.
///
/// The outgoing bytes are taken from `buf` and replaced in place by the bytes
/// clocked in during the same transfer.
pub trait SpiTransport: Send {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

impl<T: SpiTransport + ?Sized> SpiTransport for Box<T> {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).transfer(buf)
    }
}

/// Adapter from any embedded-hal `SpiDevice` to [`SpiTransport`]
pub struct HalSpi<D> {
    device: D,
    /// Device path or label, kept for log lines
    label: String,
}

impl<D> HalSpi<D> {
    pub fn new(device: D, label: impl Into<String>) -> Self {
        Self {
            device,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consume self and return the underlying device
    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D> SpiTransport for HalSpi<D>
where
    D: SpiDevice + Send,
{
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.device
            .transfer_in_place(buf)
            .map_err(|e| TransportError::Transfer(e.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{ErrorKind, ErrorType, Operation};

    /// Echoes every byte back incremented by one
    struct LoopbackDevice {
        fail: bool,
    }

    impl ErrorType for LoopbackDevice {
        type Error = ErrorKind;
    }

    impl SpiDevice for LoopbackDevice {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
            if self.fail {
                return Err(ErrorKind::ModeFault);
            }
            for op in operations.iter_mut() {
                if let Operation::TransferInPlace(words) = op {
                    for w in words.iter_mut() {
                        *w = w.wrapping_add(1);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_transfer_in_place() {
        let mut spi = HalSpi::new(LoopbackDevice { fail: false }, "loopback");
        let mut buf = [0x10, 0xFF, 0x00];
        spi.transfer(&mut buf).unwrap();
        assert_eq!(buf, [0x11, 0x00, 0x01]);
        assert_eq!(spi.label(), "loopback");
    }

    #[test]
    fn test_device_error_kind_is_preserved() {
        let mut spi = HalSpi::new(LoopbackDevice { fail: true }, "loopback");
        let mut buf = [0u8; 2];
        let err = spi.transfer(&mut buf).unwrap_err();
        assert_eq!(err, TransportError::Transfer(ErrorKind::ModeFault));
        assert_eq!(buf, [0, 0]);
    }
}
