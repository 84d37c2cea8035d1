//! Application-facing pixel grid for a HUB75 panel.
//!
//! The [`FrameBuffer`] is the single shared mutable resource between the
//! application and the scan engine: the application draws into it at its own
//! pace and hands it to [`Hub75::update_frame`] whenever a new frame is
//! ready. The engine only reads from it during that call, never while a
//! scan pass is running, so the buffer itself needs no locking.
//!
//! [`Hub75::update_frame`]: crate::Hub75::update_frame

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::OriginDimensions;
use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::RgbColor;
use embedded_graphics::Pixel;

use crate::Color;
use crate::OutOfBounds;

/// Frame buffer for a HUB75 display.
///
/// A fixed-size `ROWS` × `COLS` grid of [`Color`] values. Coordinate
/// accessors return [`OutOfBounds`] for invalid positions instead of
/// clamping; the `embedded-graphics` [`DrawTarget`] impl follows that
/// trait's contract instead and skips pixels that fall outside the panel.
pub struct FrameBuffer<const ROWS: usize, const COLS: usize> {
    data: [[Color; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> Default for FrameBuffer<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROWS: usize, const COLS: usize> FrameBuffer<ROWS, COLS> {
    /// Create a new frame buffer with every pixel off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [[Color::BLACK; COLS]; ROWS],
        }
    }

    /// Set the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfBounds`] if `x >= COLS` or `y >= ROWS`.
    pub fn set(&mut self, x: usize, y: usize, color: Color) -> Result<(), OutOfBounds> {
        if x >= COLS || y >= ROWS {
            return Err(OutOfBounds { x, y });
        }
        self.data[y][x] = color;
        Ok(())
    }

    /// Get the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfBounds`] if `x >= COLS` or `y >= ROWS`.
    pub fn get(&self, x: usize, y: usize) -> Result<Color, OutOfBounds> {
        if x >= COLS || y >= ROWS {
            return Err(OutOfBounds { x, y });
        }
        Ok(self.data[y][x])
    }

    /// Fill the entire grid with a single color.
    pub fn fill(&mut self, color: Color) {
        for row in self.data.iter_mut() {
            for pixel in row.iter_mut() {
                *pixel = color;
            }
        }
    }

    /// Clear the frame buffer to black.
    pub fn clear(&mut self) {
        self.fill(Color::BLACK);
    }

    /// Borrow one full row of pixels.
    ///
    /// # Panics
    ///
    /// Panics if `y >= ROWS`.
    #[must_use]
    pub fn row(&self, y: usize) -> &[Color; COLS] {
        &self.data[y]
    }
}

impl<const ROWS: usize, const COLS: usize> OriginDimensions for FrameBuffer<ROWS, COLS> {
    fn size(&self) -> Size {
        Size::new(COLS as u32, ROWS as u32)
    }
}

impl<const ROWS: usize, const COLS: usize> DrawTarget for FrameBuffer<ROWS, COLS> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if p.x < 0 || p.x as usize >= COLS || p.y < 0 || p.y as usize >= ROWS {
                continue;
            }
            self.data[p.y as usize][p.x as usize] = color;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::PrimitiveStyle;
    use embedded_graphics::primitives::Rectangle;

    use super::*;

    const TEST_ROWS: usize = 8;
    const TEST_COLS: usize = 16;

    type TestFrameBuffer = FrameBuffer<TEST_ROWS, TEST_COLS>;

    #[test]
    fn test_new_is_black() {
        let fb = TestFrameBuffer::new();
        for y in 0..TEST_ROWS {
            for x in 0..TEST_COLS {
                assert_eq!(fb.get(x, y), Ok(Color::BLACK));
            }
        }
    }

    #[test]
    fn test_default_matches_new() {
        let fb = TestFrameBuffer::default();
        assert_eq!(fb.get(0, 0), Ok(Color::BLACK));
        assert_eq!(
            fb.get(TEST_COLS - 1, TEST_ROWS - 1),
            Ok(Color::BLACK)
        );
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut fb = TestFrameBuffer::new();
        for y in 0..TEST_ROWS {
            for x in 0..TEST_COLS {
                let color = Color::new(x as u8, y as u8, (x + y) as u8);
                fb.set(x, y, color).unwrap();
                assert_eq!(fb.get(x, y), Ok(color));
            }
        }
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut fb = TestFrameBuffer::new();
        assert_eq!(
            fb.set(TEST_COLS, 0, Color::RED),
            Err(crate::OutOfBounds { x: TEST_COLS, y: 0 })
        );
        assert_eq!(
            fb.set(0, TEST_ROWS, Color::RED),
            Err(crate::OutOfBounds { x: 0, y: TEST_ROWS })
        );
        assert_eq!(
            fb.set(usize::MAX, usize::MAX, Color::RED),
            Err(crate::OutOfBounds {
                x: usize::MAX,
                y: usize::MAX
            })
        );
    }

    #[test]
    fn test_get_out_of_bounds() {
        let fb = TestFrameBuffer::new();
        assert!(fb.get(TEST_COLS, 0).is_err());
        assert!(fb.get(0, TEST_ROWS).is_err());
    }

    #[test]
    fn test_out_of_bounds_write_leaves_buffer_untouched() {
        let mut fb = TestFrameBuffer::new();
        fb.set(TEST_COLS, TEST_ROWS, Color::WHITE).unwrap_err();
        for y in 0..TEST_ROWS {
            for x in 0..TEST_COLS {
                assert_eq!(fb.get(x, y), Ok(Color::BLACK));
            }
        }
    }

    #[test]
    fn test_fill_and_clear() {
        let mut fb = TestFrameBuffer::new();
        fb.fill(Color::MAGENTA);
        assert_eq!(fb.get(0, 0), Ok(Color::MAGENTA));
        assert_eq!(
            fb.get(TEST_COLS - 1, TEST_ROWS - 1),
            Ok(Color::MAGENTA)
        );

        fb.clear();
        assert_eq!(fb.get(0, 0), Ok(Color::BLACK));
        assert_eq!(fb.get(TEST_COLS - 1, TEST_ROWS - 1), Ok(Color::BLACK));
    }

    #[test]
    fn test_row_accessor() {
        let mut fb = TestFrameBuffer::new();
        fb.set(3, 5, Color::CYAN).unwrap();
        let row = fb.row(5);
        assert_eq!(row.len(), TEST_COLS);
        assert_eq!(row[3], Color::CYAN);
        assert_eq!(row[2], Color::BLACK);
    }

    #[test]
    fn test_dimensions() {
        let fb = TestFrameBuffer::new();
        assert_eq!(fb.size(), Size::new(TEST_COLS as u32, TEST_ROWS as u32));
    }

    #[test]
    fn test_draw_target_rectangle() {
        let mut fb = TestFrameBuffer::new();
        Rectangle::new(Point::new(1, 1), Size::new(3, 2))
            .into_styled(PrimitiveStyle::with_fill(Color::GREEN))
            .draw(&mut fb)
            .unwrap();

        for y in 1..3 {
            for x in 1..4 {
                assert_eq!(fb.get(x, y), Ok(Color::GREEN));
            }
        }
        assert_eq!(fb.get(0, 0), Ok(Color::BLACK));
        assert_eq!(fb.get(4, 1), Ok(Color::BLACK));
    }

    #[test]
    fn test_draw_target_skips_out_of_range() {
        let mut fb = TestFrameBuffer::new();
        let pixels = [
            Pixel(Point::new(-1, 0), Color::RED),
            Pixel(Point::new(0, -1), Color::RED),
            Pixel(Point::new(TEST_COLS as i32, 0), Color::RED),
            Pixel(Point::new(0, TEST_ROWS as i32), Color::RED),
            Pixel(Point::new(2, 2), Color::RED),
        ];
        fb.draw_iter(pixels).unwrap();

        assert_eq!(fb.get(2, 2), Ok(Color::RED));
        let lit = (0..TEST_ROWS)
            .flat_map(|y| (0..TEST_COLS).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.get(x, y) != Ok(Color::BLACK))
            .count();
        assert_eq!(lit, 1);
    }
}
