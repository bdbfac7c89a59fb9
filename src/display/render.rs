// FluxSand - Screen Composition
//
// The tiles are mounted at 45 degrees, so digits are plotted on a rotated
// lattice: each logical (x, y) maps to a diagonal step on the matrix.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, Pixel, Point};

use super::font::{self, Icon, DIGITS, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::Frame;
use crate::config::GRID_SIZE;
use crate::modes::Orientation;
use crate::sand::SandGrid;

/// One of the two 2-digit fields in each orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Screen0Landscape,
    Screen1Landscape,
    Screen0Portrait,
    Screen1Portrait,
}

impl Region {
    /// Logical origin of the field's first digit.
    fn origin(self) -> (i32, i32) {
        match self {
            Self::Screen0Landscape => (-2, 1),
            Self::Screen1Landscape => (3, -3),
            Self::Screen0Portrait => (0, 1),
            Self::Screen1Portrait => (0, 1),
        }
    }

    /// Matrix (row, col) for logical (x, y).
    fn project(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Self::Screen0Landscape => (x - y + 8, x + y),
            Self::Screen1Landscape => (x - y, x + y + 16),
            Self::Screen0Portrait => (x + y, y - x + 8),
            Self::Screen1Portrait => (x + y, y - x + 24),
        }
    }
}

/// Everything the UI can put on the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// HH:MM with a steady colon.
    Clock {
        hour: u8,
        minute: u8,
        orientation: Orientation,
    },
    /// MM:SS, colon blinks with the seconds.
    Countdown {
        minutes: u8,
        seconds: u8,
        orientation: Orientation,
    },
    Humidity(u8),
    Temperature(u8),
    Hourglass,
    Blank,
}

fn infallible<T>(result: Result<T, std::convert::Infallible>) -> T {
    result.unwrap_or_else(|never| match never {})
}

/// Draw a single digit with its top-left at logical (`left`, `top`).
fn draw_digit(frame: &mut Frame, region: Region, left: i32, top: i32, digit: usize) {
    let glyph = &DIGITS[digit % 10];
    let pixels = (0..GLYPH_HEIGHT).flat_map(move |dy| {
        (0..GLYPH_WIDTH).filter_map(move |dx| {
            // Glyph rows are stored top first; logical y grows upwards.
            font::glyph_bit(glyph, dx, GLYPH_HEIGHT - 1 - dy).then(|| {
                let (row, col) = region.project(left + dx as i32, top + dy as i32);
                Pixel(Point::new(col, row), BinaryColor::On)
            })
        })
    });
    infallible(frame.draw_iter(pixels));
}

/// Two-digit value, tens first.
pub fn draw_number(frame: &mut Frame, region: Region, value: u8) {
    let (x, y) = region.origin();
    draw_digit(frame, region, x, y, (value / 10 % 10) as usize);
    draw_digit(frame, region, x + GLYPH_WIDTH as i32, y, (value % 10) as usize);
}

fn draw_chip_pixels(frame: &mut Frame, chip: usize, pixels: &[(usize, usize)]) {
    for &(row, col) in pixels {
        frame.set_chip_pixel(chip, row, col, true);
    }
}

/// A 16x16 image over the four tiles starting at `first_chip`.
fn draw_quad(frame: &mut Frame, first_chip: usize, cell: impl Fn(usize, usize) -> bool) {
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..8 {
                for l in 0..8 {
                    frame.set_chip_pixel(first_chip + i * 2 + j, k, l, cell(k + i * 8, l + j * 8));
                }
            }
        }
    }
}

fn draw_icon(frame: &mut Frame, icon: &Icon) {
    draw_quad(frame, 4, |r, c| font::icon_bit(icon, r, c));
}

fn draw_grid(frame: &mut Frame, first_chip: usize, grid: &SandGrid) {
    let rows = grid.rows();
    draw_quad(frame, first_chip, |r, c| r < GRID_SIZE && c < GRID_SIZE && rows[r][c]);
}

const LANDSCAPE_COLON: [(usize, usize); 2] = [(7, 4), (4, 7)];
const PORTRAIT_COLON_CHIP4: [(usize, usize); 7] =
    [(2, 0), (3, 1), (4, 2), (2, 2), (0, 2), (1, 3), (2, 4)];
const PORTRAIT_COLON_CHIP0: [(usize, usize); 9] =
    [(4, 0), (4, 1), (4, 2), (3, 2), (2, 2), (2, 3), (2, 4), (1, 4), (0, 4)];
const PORTRAIT_TICK_EVEN: [(usize, usize); 5] = [(0, 0), (1, 0), (1, 1), (1, 2), (2, 2)];

/// Compose `screen` into a cleared frame.  The sand chambers are only read
/// for the hourglass view.
pub fn draw_screen(frame: &mut Frame, screen: &Screen, upper: &SandGrid, lower: &SandGrid) {
    frame.clear();
    match *screen {
        Screen::Clock {
            hour,
            minute,
            orientation: Orientation::Landscape,
        } => {
            draw_chip_pixels(frame, 3, &LANDSCAPE_COLON);
            draw_number(frame, Region::Screen0Landscape, hour);
            draw_number(frame, Region::Screen1Landscape, minute);
        }
        Screen::Clock {
            hour,
            minute,
            orientation: Orientation::Portrait,
        } => {
            draw_chip_pixels(frame, 4, &PORTRAIT_COLON_CHIP4);
            draw_chip_pixels(frame, 0, &PORTRAIT_COLON_CHIP0);
            draw_number(frame, Region::Screen0Portrait, minute);
            draw_number(frame, Region::Screen1Portrait, hour);
        }
        Screen::Countdown {
            minutes,
            seconds,
            orientation: Orientation::Landscape,
        } => {
            if seconds % 2 == 1 {
                draw_chip_pixels(frame, 3, &LANDSCAPE_COLON);
            }
            draw_number(frame, Region::Screen0Landscape, minutes);
            draw_number(frame, Region::Screen1Landscape, seconds);
        }
        Screen::Countdown {
            minutes,
            seconds,
            orientation: Orientation::Portrait,
        } => {
            if seconds % 2 == 1 {
                draw_chip_pixels(frame, 4, &PORTRAIT_COLON_CHIP0);
            } else {
                draw_chip_pixels(frame, 0, &PORTRAIT_TICK_EVEN);
            }
            draw_number(frame, Region::Screen0Portrait, seconds);
            draw_number(frame, Region::Screen1Portrait, minutes);
        }
        Screen::Humidity(value) => {
            draw_icon(frame, &font::HUMIDITY_ICON);
            draw_number(frame, Region::Screen0Portrait, value);
        }
        Screen::Temperature(value) => {
            draw_icon(frame, &font::TEMPERATURE_ICON);
            draw_number(frame, Region::Screen0Portrait, value);
        }
        Screen::Hourglass => {
            draw_grid(frame, 4, upper);
            draw_grid(frame, 0, lower);
        }
        Screen::Blank => {}
    }
}
