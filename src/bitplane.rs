//! Binary Code Modulation bit-planes derived from a [`FrameBuffer`].
//!
//! The encoder slices an RGB frame into `BITS` planes, one per significant
//! bit of the quantized colour value. The scanner displays plane `i` for a
//! duration proportional to `2^i`, so summing the weighted planes
//! reproduces the original intensity. Plane storage is owned by the encoder
//! and reused on every call: encoding never allocates, which keeps it safe
//! to run between scan passes on panels refreshed hundreds of times per
//! second.

use bitfield::bitfield;
use embedded_graphics::pixelcolor::RgbColor;

use crate::framebuffer::FrameBuffer;

bitfield! {
    /// Packed colour bits for one column of one scanned row pair.
    ///
    /// One bit per colour channel per panel half:
    /// - Bit 5: Blue channel, lower half
    /// - Bit 4: Green channel, lower half
    /// - Bit 3: Red channel, lower half
    /// - Bit 2: Blue channel, upper half
    /// - Bit 1: Green channel, upper half
    /// - Bit 0: Red channel, upper half
    ///
    /// The layout matches the order in which the scanner presents the bits
    /// on the R1 G1 B1 R2 G2 B2 lines.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct Entry(u8);
    impl Debug;
    pub blu2, set_blu2: 5;
    pub grn2, set_grn2: 4;
    pub red2, set_red2: 3;
    pub blu1, set_blu1: 2;
    pub grn1, set_grn1: 1;
    pub red1, set_red1: 0;
}

#[cfg(feature = "defmt")]
impl defmt::Format for Entry {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Entry({=u8:#x})", self.0)
    }
}

impl Entry {
    /// Create an entry with every channel off.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    fn set_color0(&mut self, r: bool, g: bool, b: bool) {
        self.set_red1(r);
        self.set_grn1(g);
        self.set_blu1(b);
    }

    fn set_color1(&mut self, r: bool, g: bool, b: bool) {
        self.set_red2(r);
        self.set_grn2(g);
        self.set_blu2(b);
    }
}

/// One bit-plane: an `NROWS` × `COLS` grid of packed [`Entry`] values.
///
/// Row `r` of a plane covers panel rows `r` and `r + NROWS` through the
/// entry's color0 and color1 bits respectively.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(C)]
pub struct BitPlane<const COLS: usize, const NROWS: usize> {
    rows: [[Entry; COLS]; NROWS],
}

impl<const COLS: usize, const NROWS: usize> Default for BitPlane<COLS, NROWS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const COLS: usize, const NROWS: usize> BitPlane<COLS, NROWS> {
    /// Create a plane with every bit clear.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: [[Entry::new(); COLS]; NROWS],
        }
    }

    /// The packed entry for `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= NROWS` or `col >= COLS`.
    #[must_use]
    pub fn entry(&self, row: usize, col: usize) -> Entry {
        self.rows[row][col]
    }
}

/// Decomposes a [`FrameBuffer`] into Binary Code Modulation bit-planes.
///
/// Each 8-bit colour channel is quantized to `BITS` levels by keeping its
/// `BITS` most significant bits; plane 0 holds the least significant bit of
/// the quantized value. With `BITS == 1` the single plane degenerates to an
/// on/off threshold at half intensity.
///
/// # Type Parameters
///
/// * `ROWS` - Total number of rows in the display
/// * `COLS` - Number of columns in the display
/// * `NROWS` - Number of rows processed in parallel ([`compute_rows`])
/// * `BITS` - Number of bits per colour channel
/// * `PLANE_COUNT` - Number of bit-planes ([`compute_planes`])
///
/// [`compute_rows`]: crate::compute_rows
/// [`compute_planes`]: crate::compute_planes
pub struct BitPlaneEncoder<
    const ROWS: usize,
    const COLS: usize,
    const NROWS: usize,
    const BITS: u8,
    const PLANE_COUNT: usize,
> {
    planes: [BitPlane<COLS, NROWS>; PLANE_COUNT],
}

impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const BITS: u8,
        const PLANE_COUNT: usize,
    > Default for BitPlaneEncoder<ROWS, COLS, NROWS, BITS, PLANE_COUNT>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const BITS: u8,
        const PLANE_COUNT: usize,
    > BitPlaneEncoder<ROWS, COLS, NROWS, BITS, PLANE_COUNT>
{
    /// Create an encoder with cleared plane storage.
    #[must_use]
    pub const fn new() -> Self {
        assert!(BITS >= 1);
        assert!(BITS <= 8);
        assert!(PLANE_COUNT == BITS as usize);
        assert!(NROWS * 2 == ROWS);

        Self {
            planes: [BitPlane::new(); PLANE_COUNT],
        }
    }

    /// Encode a frame into the internal planes and return them.
    ///
    /// Deterministic in the frame contents; every entry of every plane is
    /// overwritten, so stale data from a previous frame cannot leak through.
    pub fn encode(
        &mut self,
        fb: &FrameBuffer<ROWS, COLS>,
    ) -> &[BitPlane<COLS, NROWS>; PLANE_COUNT] {
        let shift = 8 - BITS;
        for row in 0..NROWS {
            let top = fb.row(row);
            let bottom = fb.row(row + NROWS);
            for col in 0..COLS {
                let (r1, g1, b1) = (
                    top[col].r() >> shift,
                    top[col].g() >> shift,
                    top[col].b() >> shift,
                );
                let (r2, g2, b2) = (
                    bottom[col].r() >> shift,
                    bottom[col].g() >> shift,
                    bottom[col].b() >> shift,
                );
                for (bit, plane) in self.planes.iter_mut().enumerate() {
                    let mut entry = Entry::new();
                    entry.set_color0((r1 >> bit) & 1 != 0, (g1 >> bit) & 1 != 0, (b1 >> bit) & 1 != 0);
                    entry.set_color1((r2 >> bit) & 1 != 0, (g2 >> bit) & 1 != 0, (b2 >> bit) & 1 != 0);
                    plane.rows[row][col] = entry;
                }
            }
        }
        &self.planes
    }

    /// The most recently encoded planes.
    #[must_use]
    pub fn planes(&self) -> &[BitPlane<COLS, NROWS>; PLANE_COUNT] {
        &self.planes
    }

    pub(crate) fn planes_mut(&mut self) -> &mut [BitPlane<COLS, NROWS>; PLANE_COUNT] {
        &mut self.planes
    }
}
