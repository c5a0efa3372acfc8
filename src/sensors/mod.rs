pub mod mpu6000;

pub use mpu6000::Mpu6000;
