// FluxSand - LED Matrix Frame
//
// Eight cascaded MAX7219 8x8 tiles form a 16x32 matrix.  The frame is kept
// in the chips' own layout (one byte per digit register) so a flush is a
// straight copy; matrix coordinates go through the serpentine tile map.

pub mod font;
pub mod render;

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};

use crate::config::{MATRIX_CHIPS, MATRIX_COLS, MATRIX_ROWS};

/// Physical order of the four tiles inside each 2x2 block.
const TILE_MAP: [usize; 4] = [0, 2, 1, 3];

/// Frame buffer shared between the composing task and the flusher.
pub type SharedFrame = Arc<Mutex<Frame>>;

/// Matrix (row, col) to (chip, local row, local col).  `None` off-matrix.
pub fn matrix_to_chip(row: i32, col: i32) -> Option<(usize, usize, usize)> {
    if !(0..MATRIX_ROWS as i32).contains(&row) || !(0..MATRIX_COLS as i32).contains(&col) {
        return None;
    }
    let (row, col) = (row as usize, col as usize);
    let virtual_tile = row / 8 + (col / 8) * 2;
    let chip = TILE_MAP[virtual_tile % 4] + (virtual_tile - virtual_tile % 4);
    Some((chip, row % 8, col % 8))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    chips: [[u8; 8]; MATRIX_CHIPS],
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.chips = [[0; 8]; MATRIX_CHIPS];
    }

    /// Tile-local pixel.  Rows are stored bottom-up in the digit registers.
    pub fn set_chip_pixel(&mut self, chip: usize, row: usize, col: usize, on: bool) {
        if chip >= MATRIX_CHIPS || row >= 8 || col >= 8 {
            return;
        }
        let reg = &mut self.chips[chip][7 - row];
        if on {
            *reg |= 1 << col;
        } else {
            *reg &= !(1 << col);
        }
    }

    pub fn chip_pixel(&self, chip: usize, row: usize, col: usize) -> bool {
        chip < MATRIX_CHIPS && row < 8 && col < 8 && self.chips[chip][7 - row] >> col & 1 == 1
    }

    pub fn set_pixel(&mut self, row: i32, col: i32, on: bool) {
        if let Some((chip, r, c)) = matrix_to_chip(row, col) {
            self.set_chip_pixel(chip, r, c, on);
        }
    }

    pub fn pixel(&self, row: i32, col: i32) -> bool {
        matrix_to_chip(row, col).map_or(false, |(chip, r, c)| self.chip_pixel(chip, r, c))
    }

    /// Digit register contents of one chip, register 1 first.
    pub fn chip_registers(&self, chip: usize) -> [u8; 8] {
        self.chips[chip]
    }

    pub fn lit(&self) -> usize {
        self.chips.iter().flatten().map(|b| b.count_ones() as usize).sum()
    }

    /// `#`/`.` dump, one line per matrix row.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(MATRIX_ROWS * (MATRIX_COLS + 1));
        for row in 0..MATRIX_ROWS as i32 {
            for col in 0..MATRIX_COLS as i32 {
                out.push(if self.pixel(row, col) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(MATRIX_COLS as u32, MATRIX_ROWS as u32)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.y, point.x, color.is_on());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn serpentine_tile_mapping() {
        assert_eq!(matrix_to_chip(0, 0), Some((0, 0, 0)));
        assert_eq!(matrix_to_chip(8, 0), Some((2, 0, 0)));
        assert_eq!(matrix_to_chip(0, 8), Some((1, 0, 0)));
        assert_eq!(matrix_to_chip(8, 8), Some((3, 0, 0)));
        assert_eq!(matrix_to_chip(0, 16), Some((4, 0, 0)));
        assert_eq!(matrix_to_chip(15, 31), Some((7, 7, 7)));
        assert_eq!(matrix_to_chip(16, 0), None);
        assert_eq!(matrix_to_chip(0, -1), None);
    }

    #[test]
    fn chip_rows_are_stored_bottom_up() {
        let mut f = Frame::new();
        f.set_chip_pixel(3, 0, 2, true);
        assert_eq!(f.chip_registers(3)[7], 0b100);
        assert!(f.chip_pixel(3, 0, 2));
        f.set_chip_pixel(3, 0, 2, false);
        assert_eq!(f.lit(), 0);
    }

    #[test]
    fn draw_target_clips_and_sets() {
        let mut f = Frame::new();
        Line::new(Point::new(-4, 0), Point::new(40, 0))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut f)
            .unwrap();
        assert_eq!(f.lit(), MATRIX_COLS);
        assert!(f.pixel(0, 31));
        assert!(f.to_ascii().starts_with(&"#".repeat(32)));
    }
}
