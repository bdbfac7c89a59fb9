// FluxSand - Glyphs & Icons
//
// Digits are 5x7, one byte per row, top row first, MSB of the low five bits
// is the leftmost column.  Icons are 16x16, bit 15 is column 0.

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;

pub type Glyph = [u8; GLYPH_HEIGHT];

pub const DIGITS: [Glyph; 10] = [
    // 0
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    // 1
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    // 2
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    // 3
    [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
    // 4
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    // 5
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    // 6
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    // 7
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    // 8
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    // 9
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

/// Glyph bit at (`x`, `y`), `y = 0` being the top row.
pub fn glyph_bit(glyph: &Glyph, x: usize, y: usize) -> bool {
    x < GLYPH_WIDTH && y < GLYPH_HEIGHT && glyph[y] >> (GLYPH_WIDTH - 1 - x) & 1 == 1
}

pub type Icon = [u16; 16];

pub fn icon_bit(icon: &Icon, row: usize, col: usize) -> bool {
    row < 16 && col < 16 && icon[row] >> (15 - col) & 1 == 1
}

pub const HUMIDITY_ICON: Icon = [
    0b0110_0000_0000_0000,
    0b1001_0000_0000_0000,
    0b1001_0000_0000_0000,
    0b0110_1000_1011_0000,
    0b0001_1010_0000_1000,
    0b0000_0000_0000_0000,
    0b0000_1000_0000_0100,
    0b0000_0000_0000_0000,
    0b0001_0000_0000_0000,
    0b0000_0000_0000_0010,
    0b0001_0000_0000_0010,
    0b0001_0000_0000_0010,
    0b0000_1000_0000_0010,
    0b0000_0010_0000_0010,
    0b0000_0000_0011_1110,
    0b0000_0000_0000_0000,
];

pub const TEMPERATURE_ICON: Icon = [
    0b0011_1000_0000_0000,
    0b0100_0100_0000_1000,
    0b1001_0010_0000_1000,
    0b1011_1010_0011_0010,
    0b1001_0010_0100_0010,
    0b0100_0100_0100_1100,
    0b0011_1011_0001_0000,
    0b0000_0011_1001_0000,
    0b0000_0001_1100_0000,
    0b0000_1000_1010_0000,
    0b0000_1000_0101_0000,
    0b0011_0010_0010_1000,
    0b0100_0010_0001_0100,
    0b0100_1100_0000_1010,
    0b0001_0000_0000_0110,
    0b0001_0000_0000_0000,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_bits_read_left_to_right() {
        // "00100" top row of 1
        assert!(glyph_bit(&DIGITS[1], 2, 0));
        assert!(!glyph_bit(&DIGITS[1], 0, 0));
        // "11111" bottom row of 2
        assert!((0..5).all(|x| glyph_bit(&DIGITS[2], x, 6)));
        assert!(!glyph_bit(&DIGITS[2], 5, 6));
    }

    #[test]
    fn icon_bits_read_left_to_right() {
        assert!(!icon_bit(&HUMIDITY_ICON, 0, 0));
        assert!(icon_bit(&HUMIDITY_ICON, 0, 1));
        assert!(icon_bit(&HUMIDITY_ICON, 14, 14));
        assert!(!icon_bit(&HUMIDITY_ICON, 14, 15));
    }
}
