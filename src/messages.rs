use crate::errors::{DriverError, DriverResult};
use serde::{Deserialize, Serialize};

/// Encoded size of either report: timestamp, three axes, temperature, three raw counts
pub const REPORT_SIZE: usize = 8 + 3 * 4 + 4 + 3 * 2;

/// Accelerometer report
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct AccelReport {
    /// Monotonic timestamp in microseconds
    pub timestamp: u64,
    /// Acceleration X-axis (m/s²)
    pub x: f32,
    /// Acceleration Y-axis (m/s²)
    pub y: f32,
    /// Acceleration Z-axis (m/s²)
    pub z: f32,
    /// Die temperature (°C)
    pub temperature: f32,
    pub x_raw: i16,
    pub y_raw: i16,
    pub z_raw: i16,
}

/// Gyroscope report, filled from the same burst as the matching [`AccelReport`]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct GyroReport {
    /// Monotonic timestamp in microseconds
    pub timestamp: u64,
    /// Angular rate X-axis (rad/s)
    pub x: f32,
    /// Angular rate Y-axis (rad/s)
    pub y: f32,
    /// Angular rate Z-axis (rad/s)
    pub z: f32,
    /// Die temperature (°C)
    pub temperature: f32,
    pub x_raw: i16,
    pub y_raw: i16,
    pub z_raw: i16,
}

/// Fixed little-endian record layout shared by both report types.
fn encode_fields(
    buf: &mut [u8],
    timestamp: u64,
    axes: [f32; 3],
    temperature: f32,
    raw: [i16; 3],
) -> DriverResult<usize> {
    if buf.len() < REPORT_SIZE {
        return Err(DriverError::NoSpace {
            needed: REPORT_SIZE,
            available: buf.len(),
        });
    }

    buf[0..8].copy_from_slice(&timestamp.to_le_bytes());
    for (i, v) in axes.iter().enumerate() {
        let at = 8 + i * 4;
        buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
    buf[20..24].copy_from_slice(&temperature.to_le_bytes());
    for (i, v) in raw.iter().enumerate() {
        let at = 24 + i * 2;
        buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
    }
    Ok(REPORT_SIZE)
}

impl AccelReport {
    /// Copy the report into `buf`; an undersized buffer is left untouched
    pub fn encode(&self, buf: &mut [u8]) -> DriverResult<usize> {
        encode_fields(
            buf,
            self.timestamp,
            [self.x, self.y, self.z],
            self.temperature,
            [self.x_raw, self.y_raw, self.z_raw],
        )
    }
}

impl GyroReport {
    /// Copy the report into `buf`; an undersized buffer is left untouched
    pub fn encode(&self, buf: &mut [u8]) -> DriverResult<usize> {
        encode_fields(
            buf,
            self.timestamp,
            [self.x, self.y, self.z],
            self.temperature,
            [self.x_raw, self.y_raw, self.z_raw],
        )
    }
}

/// Unified message enum carried on the topic bus
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum SensorMessage {
    Accel(AccelReport),
    Gyro(GyroReport),
}

impl SensorMessage {
    pub fn timestamp(&self) -> u64 {
        match self {
            SensorMessage::Accel(r) => r.timestamp,
            SensorMessage::Gyro(r) => r.timestamp,
        }
    }

    /// Encode whichever report this message carries
    pub fn encode(&self, buf: &mut [u8]) -> DriverResult<usize> {
        match self {
            SensorMessage::Accel(r) => r.encode(buf),
            SensorMessage::Gyro(r) => r.encode(buf),
        }
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let report = AccelReport {
            timestamp: 0x0102_0304_0506_0708,
            x: 1.0,
            y: -2.0,
            z: 9.81,
            temperature: 25.0,
            x_raw: 1,
            y_raw: -1,
            z_raw: 4096,
        };
        let mut buf = [0u8; REPORT_SIZE + 4];
        assert_eq!(report.encode(&mut buf).unwrap(), REPORT_SIZE);

        assert_eq!(&buf[0..8], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(&buf[8..12], &1.0f32.to_le_bytes());
        assert_eq!(&buf[16..20], &9.81f32.to_le_bytes());
        assert_eq!(&buf[20..24], &25.0f32.to_le_bytes());
        assert_eq!(&buf[26..28], &(-1i16).to_le_bytes());
        assert_eq!(&buf[28..30], &4096i16.to_le_bytes());
        // Bytes past the record are not written
        assert_eq!(&buf[REPORT_SIZE..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_rejects_short_buffer_untouched() {
        let report = GyroReport {
            timestamp: 42,
            x: 0.5,
            ..Default::default()
        };
        let mut buf = [0xAAu8; REPORT_SIZE - 1];
        let err = report.encode(&mut buf).unwrap_err();
        assert_eq!(
            err,
            DriverError::NoSpace {
                needed: REPORT_SIZE,
                available: REPORT_SIZE - 1
            }
        );
        assert!(buf.iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn test_message_json() {
        let msg = SensorMessage::Gyro(GyroReport {
            timestamp: 1234,
            z: 0.25,
            ..Default::default()
        });
        assert_eq!(msg.timestamp(), 1234);

        let json = msg.to_json().unwrap();
        assert!(json.contains("Gyro"));
        assert!(json.contains("1234"));
    }
}
