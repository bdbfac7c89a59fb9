// FluxSand - Environment Sensor Drivers
//
// AHT20 (humidity, temperature), BMP280 (pressure) and the ADS1115 ADC
// carrying the NTC (AIN0) and photodiode (AIN1) dividers.  Decoding is pure
// and host-tested; bus access is device-only.

// ---------------------------------------------------------------------------
// AHT20
// ---------------------------------------------------------------------------

pub const AHT20_CMD_MEASURE: [u8; 3] = [0xAC, 0x33, 0x00];
pub const AHT20_CMD_INIT: [u8; 3] = [0xBE, 0x08, 0x00];
pub const AHT20_MEASURE_MS: u64 = 80;
const AHT20_BUSY: u8 = 0x80;

/// (temperature °C, relative humidity %) from a 7-byte reply, `None` while
/// the sensor is still busy.
pub fn aht20_decode(raw: &[u8; 7]) -> Option<(f32, f32)> {
    if raw[0] & AHT20_BUSY != 0 {
        return None;
    }
    let hum = (raw[1] as u32) << 12 | (raw[2] as u32) << 4 | (raw[3] as u32) >> 4;
    let temp = ((raw[3] & 0x0F) as u32) << 16 | (raw[4] as u32) << 8 | raw[5] as u32;
    let full = (1u32 << 20) as f32;
    Some((temp as f32 / full * 200.0 - 50.0, hum as f32 / full * 100.0))
}

// ---------------------------------------------------------------------------
// BMP280
// ---------------------------------------------------------------------------

pub const BMP280_REG_CALIB: u8 = 0x88;
pub const BMP280_REG_CTRL_MEAS: u8 = 0xF4;
pub const BMP280_REG_CONFIG: u8 = 0xF5;
pub const BMP280_REG_DATA: u8 = 0xF7;
/// Temperature and pressure x1 oversampling, normal mode.
pub const BMP280_CTRL_MEAS_NORMAL: u8 = 0x27;

/// Factory trim values read from 0x88..0xA0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bmp280Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

impl Bmp280Calibration {
    pub fn from_bytes(raw: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }

    /// (temperature °C, pressure Pa) from raw 20-bit ADC values, using the
    /// double-precision compensation.
    pub fn compensate(&self, adc_t: i32, adc_p: i32) -> (f64, f64) {
        let (adc_t, adc_p) = (adc_t as f64, adc_p as f64);

        let var1 = (adc_t / 16384.0 - self.t1 as f64 / 1024.0) * self.t2 as f64;
        let d = adc_t / 131072.0 - self.t1 as f64 / 8192.0;
        let var2 = d * d * self.t3 as f64;
        let t_fine = var1 + var2;
        let temperature = t_fine / 5120.0;

        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * self.p6 as f64 / 32768.0;
        var2 += var1 * self.p5 as f64 * 2.0;
        var2 = var2 / 4.0 + self.p4 as f64 * 65536.0;
        var1 = (self.p3 as f64 * var1 * var1 / 524288.0 + self.p2 as f64 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.p1 as f64;
        if var1 == 0.0 {
            return (temperature, 0.0);
        }
        let mut p = 1048576.0 - adc_p;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = self.p9 as f64 * p * p / 2147483648.0;
        let var2 = p * self.p8 as f64 / 32768.0;
        (temperature, p + (var1 + var2 + self.p7 as f64) / 16.0)
    }
}

/// (adc_t, adc_p) from the 6-byte data burst at 0xF7.
pub fn bmp280_raw(data: &[u8; 6]) -> (i32, i32) {
    let word = |i: usize| (data[i] as i32) << 12 | (data[i + 1] as i32) << 4 | (data[i + 2] as i32) >> 4;
    (word(3), word(0))
}

// ---------------------------------------------------------------------------
// ADS1115
// ---------------------------------------------------------------------------

pub const ADS1115_REG_CONVERSION: u8 = 0x00;
pub const ADS1115_REG_CONFIG: u8 = 0x01;
pub const ADS1115_CHANNEL_NTC: u8 = 0;
pub const ADS1115_CHANNEL_PHOTO: u8 = 1;
/// ±4.096 V full scale.
const ADS1115_FULL_SCALE_V: f32 = 4.096;

/// Single-shot, AINx vs GND, ±4.096 V, 128 SPS, comparator off.
pub fn ads1115_config(channel: u8) -> u16 {
    0x8000 | ((0x04 + (channel as u16 & 0x03)) << 12) | 0x0200 | 0x0100 | 0x0080 | 0x0003
}

pub fn ads1115_volts(raw: [u8; 2]) -> f32 {
    i16::from_be_bytes(raw) as f32 * ADS1115_FULL_SCALE_V / 32768.0
}

#[cfg(target_os = "espidf")]
pub use device::EnvSensors;

#[cfg(target_os = "espidf")]
mod device {
    use std::sync::PoisonError;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::config::{I2C_ADDR_ADS1115, I2C_ADDR_AHT20, I2C_ADDR_BMP280, I2C_TIMEOUT_TICKS};
    use crate::drivers::{EnvSource, SharedBus};
    use crate::env::{ntc_celsius, photo_lux};
    use crate::events::EnvReading;

    const ADS1115_CONVERSION_MS: u64 = 10;

    pub struct EnvSensors {
        bus: SharedBus,
        bmp_calibration: Option<Bmp280Calibration>,
    }

    impl EnvSensors {
        pub fn new(bus: SharedBus) -> Self {
            Self {
                bus,
                bmp_calibration: None,
            }
        }

        /// Calibrate the AHT20 and start the BMP280 in normal mode.  A missing
        /// BMP280 only costs the pressure reading.
        pub fn init(&mut self) -> anyhow::Result<()> {
            let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            bus.write(I2C_ADDR_AHT20, &AHT20_CMD_INIT, I2C_TIMEOUT_TICKS)?;

            let mut calib = [0u8; 24];
            match bus.write_read(I2C_ADDR_BMP280, &[BMP280_REG_CALIB], &mut calib, I2C_TIMEOUT_TICKS) {
                Ok(()) => {
                    bus.write(I2C_ADDR_BMP280, &[BMP280_REG_CTRL_MEAS, BMP280_CTRL_MEAS_NORMAL], I2C_TIMEOUT_TICKS)?;
                    bus.write(I2C_ADDR_BMP280, &[BMP280_REG_CONFIG, 0x00], I2C_TIMEOUT_TICKS)?;
                    self.bmp_calibration = Some(Bmp280Calibration::from_bytes(&calib));
                }
                Err(e) => log::warn!("BMP280 not found ({e}); pressure disabled"),
            }
            log::info!("Environment sensors initialised");
            Ok(())
        }

        fn read_aht20(&self) -> anyhow::Result<(f32, f32)> {
            self.bus
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write(I2C_ADDR_AHT20, &AHT20_CMD_MEASURE, I2C_TIMEOUT_TICKS)?;
            thread::sleep(Duration::from_millis(AHT20_MEASURE_MS));
            let mut raw = [0u8; 7];
            self.bus
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .read(I2C_ADDR_AHT20, &mut raw, I2C_TIMEOUT_TICKS)?;
            aht20_decode(&raw).ok_or_else(|| anyhow::anyhow!("AHT20 still busy"))
        }

        fn read_pressure(&self) -> anyhow::Result<f32> {
            let Some(calib) = self.bmp_calibration else {
                return Ok(f32::NAN);
            };
            let mut data = [0u8; 6];
            self.bus
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_read(I2C_ADDR_BMP280, &[BMP280_REG_DATA], &mut data, I2C_TIMEOUT_TICKS)?;
            let (adc_t, adc_p) = bmp280_raw(&data);
            Ok(calib.compensate(adc_t, adc_p).1 as f32)
        }

        fn read_adc(&self, channel: u8) -> anyhow::Result<f32> {
            let [hi, lo] = ads1115_config(channel).to_be_bytes();
            self.bus
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write(I2C_ADDR_ADS1115, &[ADS1115_REG_CONFIG, hi, lo], I2C_TIMEOUT_TICKS)?;
            thread::sleep(Duration::from_millis(ADS1115_CONVERSION_MS));
            let mut raw = [0u8; 2];
            self.bus
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_read(I2C_ADDR_ADS1115, &[ADS1115_REG_CONVERSION], &mut raw, I2C_TIMEOUT_TICKS)?;
            Ok(ads1115_volts(raw))
        }
    }

    impl EnvSource for EnvSensors {
        fn read_env(&mut self) -> anyhow::Result<EnvReading> {
            let (temperature_c, humidity_pct) = self.read_aht20()?;
            let pressure_pa = self.read_pressure()?;
            let ntc_v = self.read_adc(ADS1115_CHANNEL_NTC)?;
            let photo_v = self.read_adc(ADS1115_CHANNEL_PHOTO)?;
            Ok(EnvReading {
                temperature_c,
                humidity_pct,
                pressure_pa,
                lux: photo_lux(photo_v).unwrap_or(f32::NAN),
                ntc_c: ntc_celsius(ntc_v).unwrap_or(f32::NAN),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aht20_midscale() {
        // Humidity 0x80000 = 50 %, temperature 0x60000 = 25 °C.
        let raw = [0x1C, 0x80, 0x00, 0x06, 0x00, 0x00, 0x00];
        let (t, h) = aht20_decode(&raw).unwrap();
        assert!((h - 50.0).abs() < 1e-3);
        assert!((t - 25.0).abs() < 1e-3);
        assert_eq!(aht20_decode(&[0x9C, 0, 0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn bmp280_reference_values() {
        // Worked example from the BMP280 datasheet.
        let calib = Bmp280Calibration {
            t1: 27504,
            t2: 26435,
            t3: -1000,
            p1: 36477,
            p2: -10685,
            p3: 3024,
            p4: 2855,
            p5: 140,
            p6: -7,
            p7: 15500,
            p8: -14600,
            p9: 6000,
        };
        let (t, p) = calib.compensate(519888, 415148);
        assert!((t - 25.08).abs() < 0.01, "{t}");
        assert!((p - 100653.27).abs() < 1.0, "{p}");
    }

    #[test]
    fn bmp280_trim_is_little_endian() {
        let mut raw = [0u8; 24];
        raw[0..2].copy_from_slice(&27504u16.to_le_bytes());
        raw[4..6].copy_from_slice(&(-1000i16).to_le_bytes());
        let c = Bmp280Calibration::from_bytes(&raw);
        assert_eq!(c.t1, 27504);
        assert_eq!(c.t3, -1000);
    }

    #[test]
    fn bmp280_burst_unpacks_20_bit_words() {
        let (t, p) = bmp280_raw(&[0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00]);
        assert_eq!(p, 0x655AC);
        assert_eq!(t, 0x7EED0);
    }

    #[test]
    fn ads1115_channel_and_scale() {
        assert_eq!(ads1115_config(0), 0xC383);
        assert_eq!(ads1115_config(1), 0xD383);
        assert!((ads1115_volts(0x4000i16.to_be_bytes()) - 2.048).abs() < 1e-6);
    }
}
