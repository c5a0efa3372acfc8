use serde::{Deserialize, Serialize};

const STANDARD_GRAVITY: f32 = 9.80665;

/// m/s² per LSB at ±8 g (4096 LSB/g)
pub const ACCEL_RANGE_SCALE: f32 = STANDARD_GRAVITY / 4096.0;

/// rad/s per LSB at ±2000 °/s (16.4 LSB per °/s)
pub const GYRO_RANGE_SCALE: f32 = (1.0 / 16.4) * (std::f32::consts::PI / 180.0);

/// Die temperature in °C from the raw TEMP_OUT word
pub fn temperature_celsius(raw: i16) -> f32 {
    raw as f32 / 340.0 + 36.53
}

/// Per-axis offset and scale applied after range scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleCalibration {
    pub x_offset: f32,
    pub x_scale: f32,
    pub y_offset: f32,
    pub y_scale: f32,
    pub z_offset: f32,
    pub z_scale: f32,
}

impl Default for ScaleCalibration {
    fn default() -> Self {
        Self {
            x_offset: 0.0,
            x_scale: 1.0,
            y_offset: 0.0,
            y_scale: 1.0,
            z_offset: 0.0,
            z_scale: 1.0,
        }
    }
}

impl ScaleCalibration {
    /// `(raw * range_scale - offset) * scale` for each axis
    pub fn apply(&self, raw: [i16; 3], range_scale: f32) -> [f32; 3] {
        [
            (raw[0] as f32 * range_scale - self.x_offset) * self.x_scale,
            (raw[1] as f32 * range_scale - self.y_offset) * self.y_scale,
            (raw[2] as f32 * range_scale - self.z_offset) * self.z_scale,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_calibration() {
        let cal = ScaleCalibration::default();
        let out = cal.apply([4096, -4096, 0], ACCEL_RANGE_SCALE);
        assert!((out[0] - STANDARD_GRAVITY).abs() < 1e-4);
        assert!((out[1] + STANDARD_GRAVITY).abs() < 1e-4);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_offset_applied_before_scale() {
        let cal = ScaleCalibration {
            x_offset: 1.0,
            x_scale: 2.0,
            y_offset: -0.5,
            z_scale: 0.0,
            ..Default::default()
        };
        let out = cal.apply([10, 10, 10], 0.5);
        assert_eq!(out, [8.0, 5.5, 0.0]);
    }

    #[test]
    fn test_gyro_full_scale() {
        let out = ScaleCalibration::default().apply([i16::MAX, 0, 0], GYRO_RANGE_SCALE);
        // 32767 / 16.4 ≈ 1998 °/s
        assert!((out[0].to_degrees() - 1998.0).abs() < 1.0);
    }

    #[test]
    fn test_temperature() {
        assert!((temperature_celsius(0) - 36.53).abs() < 1e-4);
        assert!((temperature_celsius(-3400) - 26.53).abs() < 1e-3);
    }
}
