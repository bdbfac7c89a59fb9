// FluxSand - MAX7219 Matrix Chain
//
// Eight daisy-chained MAX7219s on one SPI chip select.  Every transfer shifts
// one 16-bit (register, data) word per chip; the first word sent ends up in
// the last chip, so packets are laid out in reverse chain order.

use crate::config::MATRIX_CHIPS;
use crate::display::Frame;

pub const REG_NOOP: u8 = 0x00;
pub const REG_DIGIT0: u8 = 0x01;
pub const REG_DECODE_MODE: u8 = 0x09;
pub const REG_INTENSITY: u8 = 0x0A;
pub const REG_SCAN_LIMIT: u8 = 0x0B;
pub const REG_SHUTDOWN: u8 = 0x0C;
pub const REG_DISPLAY_TEST: u8 = 0x0F;

pub const MAX_INTENSITY: u8 = 0x0F;

/// One chip-select cycle: a (register, data) pair per chip.
pub type Packet = [u8; 2 * MATRIX_CHIPS];

/// Byte offset of chip `index` inside a packet.
fn slot(index: usize) -> usize {
    2 * (MATRIX_CHIPS - 1 - index)
}

/// Same register and value on every chip.
pub fn broadcast(reg: u8, value: u8) -> Packet {
    let mut packet = [0u8; 2 * MATRIX_CHIPS];
    for pair in packet.chunks_exact_mut(2) {
        pair[0] = reg;
        pair[1] = value;
    }
    packet
}

/// One register per chip, in chip order.
pub fn per_chip(writes: [(u8, u8); MATRIX_CHIPS]) -> Packet {
    let mut packet = [0u8; 2 * MATRIX_CHIPS];
    for (index, (reg, value)) in writes.into_iter().enumerate() {
        packet[slot(index)] = reg;
        packet[slot(index) + 1] = value;
    }
    packet
}

/// Power-up sequence: shutdown, no test, raw matrix mode, all 8 digits,
/// `intensity`, then wake.
pub fn init_sequence(intensity: u8) -> [Packet; 6] {
    [
        broadcast(REG_SHUTDOWN, 0x00),
        broadcast(REG_DISPLAY_TEST, 0x00),
        broadcast(REG_DECODE_MODE, 0x00),
        broadcast(REG_SCAN_LIMIT, 0x07),
        broadcast(REG_INTENSITY, intensity.min(MAX_INTENSITY)),
        broadcast(REG_SHUTDOWN, 0x01),
    ]
}

/// The whole frame as 8 digit-register writes.
pub fn encode_frame(frame: &Frame) -> [Packet; 8] {
    std::array::from_fn(|digit| {
        per_chip(std::array::from_fn(|chip| {
            (REG_DIGIT0 + digit as u8, frame.chip_registers(chip)[digit])
        }))
    })
}

#[cfg(target_os = "espidf")]
pub use device::Max7219;

#[cfg(target_os = "espidf")]
mod device {
    use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver};

    use super::*;
    use crate::drivers::MatrixDisplay;

    pub struct Max7219 {
        spi: SpiDeviceDriver<'static, SpiDriver<'static>>,
        intensity: Option<u8>,
    }

    impl Max7219 {
        pub fn new(spi: SpiDeviceDriver<'static, SpiDriver<'static>>) -> Self {
            Self {
                spi,
                intensity: None,
            }
        }

        pub fn init(&mut self, intensity: u8) -> anyhow::Result<()> {
            for packet in init_sequence(intensity) {
                self.spi.write(&packet)?;
            }
            self.intensity = Some(intensity.min(MAX_INTENSITY));
            log::info!("MAX7219 chain initialised ({MATRIX_CHIPS} chips)");
            Ok(())
        }
    }

    impl MatrixDisplay for Max7219 {
        fn push_frame(&mut self, frame: &Frame, intensity: u8) -> anyhow::Result<()> {
            let intensity = intensity.min(MAX_INTENSITY);
            if self.intensity != Some(intensity) {
                self.spi.write(&broadcast(REG_INTENSITY, intensity))?;
                self.intensity = Some(intensity);
            }
            for packet in encode_frame(frame) {
                self.spi.write(&packet)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_chip_goes_last_on_the_wire() {
        let mut writes = [(REG_NOOP, 0); MATRIX_CHIPS];
        writes[0] = (REG_INTENSITY, 5);
        let packet = per_chip(writes);
        assert_eq!(&packet[14..], &[REG_INTENSITY, 5]);
        assert!(packet[..14].iter().all(|&b| b == 0));
    }

    #[test]
    fn frame_encodes_row_registers() {
        let mut frame = Frame::new();
        // Tile-local row 7 is digit register 1.
        frame.set_chip_pixel(7, 7, 0, true);
        frame.set_chip_pixel(0, 0, 3, true);

        let packets = encode_frame(&frame);
        assert_eq!(packets[0][0..2], [REG_DIGIT0, 0b1]);
        assert_eq!(packets[7][14..16], [REG_DIGIT0 + 7, 0b1000]);
        for (digit, packet) in packets.iter().enumerate() {
            assert!(packet.chunks_exact(2).all(|p| p[0] == REG_DIGIT0 + digit as u8));
        }
    }

    #[test]
    fn init_clamps_intensity() {
        let seq = init_sequence(40);
        assert_eq!(seq[4], broadcast(REG_INTENSITY, MAX_INTENSITY));
        assert_eq!(seq[5][..2], [REG_SHUTDOWN, 1]);
    }
}
