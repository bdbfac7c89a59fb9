// FluxSand - MPU-9250 IMU Driver
//
// Register-level driver over the shared I2C bus.  The part also speaks SPI
// with the same register map; this board puts it on I2C next to the
// environment sensors.  The sample conversion is plain arithmetic and builds
// everywhere; the bus access only on the device.

use crate::config::{ACCEL_SCALE_16G, GYRO_SCALE_2000};
use crate::math::Vector3;

// MPU-9250 register addresses
pub const REG_SMPLRT_DIV: u8 = 0x19;
pub const REG_CONFIG: u8 = 0x1A;
pub const REG_GYRO_CONFIG: u8 = 0x1B;
pub const REG_ACCEL_CONFIG: u8 = 0x1C;
pub const REG_ACCEL_CONFIG_2: u8 = 0x1D;
pub const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte sensor burst
pub const REG_PWR_MGMT_1: u8 = 0x6B;
pub const REG_PWR_MGMT_2: u8 = 0x6C;
pub const REG_WHO_AM_I: u8 = 0x75;

/// Accepted WHO_AM_I answers (MPU-9250, MPU-6500, MPU-9255 clones).
pub const WHO_AM_I_VALUES: [u8; 3] = [0x71, 0x70, 0x68];

pub const BURST_LEN: usize = 14;

/// Scale one big-endian burst (accel, temperature, gyro) at ±16 g and
/// ±2000 °/s.
pub fn convert_burst(raw: &[u8; BURST_LEN]) -> (Vector3, Vector3) {
    let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f32;
    let accel = Vector3::new(word(0), word(2), word(4)).scale(ACCEL_SCALE_16G);
    // raw[6..8] = temperature, skipped
    let gyro = Vector3::new(word(8), word(10), word(12)).scale(GYRO_SCALE_2000);
    (accel, gyro)
}

#[cfg(target_os = "espidf")]
pub use device::Mpu9250;

#[cfg(target_os = "espidf")]
mod device {
    use std::sync::PoisonError;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::config::{I2C_ADDR_MPU9250, I2C_TIMEOUT_TICKS};
    use crate::drivers::{ImuSource, SharedBus};

    pub struct Mpu9250 {
        bus: SharedBus,
    }

    impl Mpu9250 {
        pub fn new(bus: SharedBus) -> Self {
            Self { bus }
        }

        fn write(&self, reg: u8, value: u8) -> anyhow::Result<()> {
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            bus.write(I2C_ADDR_MPU9250, &[reg, value], I2C_TIMEOUT_TICKS)?;
            Ok(())
        }

        /// Verify the device is reachable on the I2C bus.
        pub fn is_connected(&self) -> bool {
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            let mut buf = [0u8; 1];
            match bus.write_read(I2C_ADDR_MPU9250, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS) {
                Ok(()) => WHO_AM_I_VALUES.contains(&buf[0]),
                Err(_) => false,
            }
        }

        /// Reset, select the PLL clock, ±16 g / ±2000 °/s, 500 Hz output.
        pub fn init(&self) -> anyhow::Result<()> {
            self.write(REG_PWR_MGMT_1, 0x80)?;
            thread::sleep(Duration::from_millis(100));
            if !self.is_connected() {
                anyhow::bail!("MPU-9250 not answering WHO_AM_I");
            }
            self.write(REG_PWR_MGMT_1, 0x03)?;
            self.write(REG_PWR_MGMT_2, 0x00)?;
            self.write(REG_SMPLRT_DIV, 0x01)?;
            self.write(REG_CONFIG, 0x00)?;
            self.write(REG_GYRO_CONFIG, 0x18)?;
            self.write(REG_ACCEL_CONFIG, 0x18)?;
            self.write(REG_ACCEL_CONFIG_2, 0x00)?;

            log::info!("MPU-9250 initialised (±16g, ±2000°/s)");
            Ok(())
        }
    }

    impl ImuSource for Mpu9250 {
        fn read_imu(&mut self) -> anyhow::Result<(Vector3, Vector3)> {
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            let mut raw = [0u8; BURST_LEN];
            bus.write_read(I2C_ADDR_MPU9250, &[REG_ACCEL_XOUT_H], &mut raw, I2C_TIMEOUT_TICKS)?;
            Ok(convert_burst(&raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_big_endian_and_scaled() {
        let mut raw = [0u8; BURST_LEN];
        // az = +2048 LSB = 1 g at ±16 g
        raw[4..6].copy_from_slice(&2048i16.to_be_bytes());
        // gz = -16.4 LSB/(°/s) * 90 ~ -1476 LSB
        raw[12..14].copy_from_slice(&(-1476i16).to_be_bytes());
        // temperature bytes are ignored
        raw[6] = 0x7f;

        let (accel, gyro) = convert_burst(&raw);
        assert!((accel.z - 9.80665).abs() < 1e-3);
        assert_eq!(accel.x, 0.0);
        assert!((gyro.z.to_degrees() + 90.0).abs() < 0.1, "{}", gyro.z.to_degrees());
        assert_eq!(gyro.x, 0.0);
    }
}
