//! Refresh engine for HUB75 RGB LED matrix panels.
//!
//! ## How HUB75 panels are driven
//!
//! A HUB75 panel is not a random-access display: it is a long daisy-chained
//! shift register scanned one row pair at a time. The connector carries six
//! serial colour lines (R1 G1 B1 for the upper half, R2 G2 B2 for the lower
//! half), a shift clock (CLK), a latch (LAT), an active-low output enable
//! (OE), and up to five row-address lines (A–E) selecting which row pair is
//! lit. The controller must continuously stream the whole image: shift a
//! row's worth of colour bits, latch it, then pulse OE to light the row,
//! fast enough that the eye sees a steady picture.
//!
//! Colour depth comes from Binary Code Modulation (BCM): each bit of a
//! colour value gets its own pass over the panel, displayed for a duration
//! proportional to its positional weight (1, 2, 4, 8, …), so a `BITS`-deep
//! channel yields `2^BITS` apparent intensity levels from purely on/off
//! outputs.
//!
//! ## Components
//!
//! - [`FrameBuffer`] – the full-resolution RGB grid the application draws
//!   into, also an `embedded-graphics` [`DrawTarget`] so any text or
//!   primitive renderer can produce frame contents.
//! - [`BitPlaneEncoder`] – decomposes the frame into `BITS` bit-planes
//!   (plane 0 = least significant bit) using reusable buffers.
//! - [`Hub75`] – the scanner: an explicit state machine that bit-bangs the
//!   HUB75 signal sequence through `embedded-hal` output pins and times the
//!   OE pulses through a `DelayNs` implementation.
//!
//! [`DrawTarget`]: embedded_graphics::draw_target::DrawTarget
//!
//! ## Example
//!
//! ```no_run
//! # struct Pin;
//! # impl embedded_hal::digital::ErrorType for Pin { type Error = core::convert::Infallible; }
//! # impl embedded_hal::digital::OutputPin for Pin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Delay;
//! # impl embedded_hal::delay::DelayNs for Delay {
//! #     fn delay_ns(&mut self, _ns: u32) {}
//! # }
//! # fn pin() -> Pin { Pin }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use hub75_refresh::{compute_planes, compute_rows, Color, FrameBuffer, Hub75, PinMapping};
//!
//! const ROWS: usize = 32;
//! const COLS: usize = 64;
//! const NROWS: usize = compute_rows(ROWS);
//! const BITS: u8 = 4;
//! const PLANES: usize = compute_planes(BITS);
//!
//! let pins = PinMapping {
//!     red1: pin(),
//!     grn1: pin(),
//!     blu1: pin(),
//!     red2: pin(),
//!     grn2: pin(),
//!     blu2: pin(),
//!     addr0: Some(pin()),
//!     addr1: Some(pin()),
//!     addr2: Some(pin()),
//!     addr3: Some(pin()),
//!     addr4: None,
//!     clock: pin(),
//!     latch: pin(),
//!     blank: pin(),
//! };
//!
//! let mut hub75: Hub75<_, _, ROWS, COLS, NROWS, BITS, PLANES> = Hub75::configure(pins, Delay)?;
//!
//! let mut fb = FrameBuffer::<ROWS, COLS>::new();
//! fb.set(0, 0, Color::new(255, 0, 0))?;
//! hub75.update_frame(&fb);
//!
//! loop {
//!     // must run continuously at kHz scale; update_frame may be called at
//!     // any slower cadence from the application side
//!     hub75.refresh();
//! }
//! # }
//! ```
//!
//! ## Available Feature Flags
//!
//! ### `defmt` Feature
//! Implements `defmt::Format` for plane entries, scan steps, and error types
//! so they can be emitted with the `defmt` logging framework. No functional
//! changes; purely adds trait impls.
//!
//! ### `log` Feature
//! Emits a `log::debug!` trace when the engine is configured. Nothing is
//! ever logged from the scan path.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]

use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::digital::OutputPin;

pub mod bitplane;
pub mod framebuffer;
pub mod scanner;

pub use bitplane::BitPlaneEncoder;
pub use framebuffer::FrameBuffer;
pub use scanner::Hub75;
pub use scanner::ScanStep;
pub use scanner::StepOutcome;

/// Color type used in the framebuffer
pub type Color = Rgb888;

/// Computes the number of row pairs scanned in parallel.
///
/// HUB75 panels drive two rows at once through the R1/G1/B1 and R2/G2/B2
/// lines, so the scanner only addresses `rows / 2` positions.
#[must_use]
pub const fn compute_rows(rows: usize) -> usize {
    rows / 2
}

/// Computes the number of bit-planes needed for a given colour depth.
///
/// Binary Code Modulation uses one plane per significant bit, so this is
/// simply `bits`, provided as a `const fn` so it can size const-generic
/// parameters next to [`compute_rows`].
#[must_use]
pub const fn compute_planes(bits: u8) -> usize {
    bits as usize
}

/// Computes how many row-address lines a panel with `nrows` scanned row
/// pairs requires.
///
/// A 1/16-scan panel (`nrows == 16`) needs four lines (A–D), a 1/32-scan
/// panel needs all five (A–E).
#[must_use]
pub const fn compute_address_lines(nrows: usize) -> usize {
    let mut lines = 0;
    while (1 << lines) < nrows {
        lines += 1;
    }
    lines
}

/// Logical signals of the HUB75 connector.
///
/// Used to identify which pin a configuration failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    /// Red data, upper half of the panel
    Red1,
    /// Green data, upper half of the panel
    Grn1,
    /// Blue data, upper half of the panel
    Blu1,
    /// Red data, lower half of the panel
    Red2,
    /// Green data, lower half of the panel
    Grn2,
    /// Blue data, lower half of the panel
    Blu2,
    /// Row-address line with the given bit index (0 = A)
    Addr(u8),
    /// Shift-register clock
    Clock,
    /// Row data latch
    Latch,
    /// Output enable (active low)
    Blank,
}

impl core::fmt::Display for Signal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Red1 => f.write_str("red1"),
            Self::Grn1 => f.write_str("grn1"),
            Self::Blu1 => f.write_str("blu1"),
            Self::Red2 => f.write_str("red2"),
            Self::Grn2 => f.write_str("grn2"),
            Self::Blu2 => f.write_str("blu2"),
            Self::Addr(line) => write!(f, "addr{line}"),
            Self::Clock => f.write_str("clock"),
            Self::Latch => f.write_str("latch"),
            Self::Blank => f.write_str("blank"),
        }
    }
}

/// Pin assignment for the HUB75 connector.
///
/// All fields are owned pins; the scanner consumes the mapping in
/// [`Hub75::configure`]. Because pins are moved in and `OutputPin`
/// implementations are not clonable, assigning the same physical pin to two
/// signals is unrepresentable.
///
/// The five address lines are optional: a panel only needs enough of them to
/// address its scanned row pairs (see [`compute_address_lines`]), and short
/// panels physically lack the upper lines. `configure` rejects a mapping
/// that is missing a *required* line.
///
/// The mapping is generic over a single pin type; with heterogeneous pins,
/// use the type-erased pin of your HAL.
pub struct PinMapping<P: OutputPin> {
    /// Red data, upper half
    pub red1: P,
    /// Green data, upper half
    pub grn1: P,
    /// Blue data, upper half
    pub blu1: P,
    /// Red data, lower half
    pub red2: P,
    /// Green data, lower half
    pub grn2: P,
    /// Blue data, lower half
    pub blu2: P,
    /// Row-address line A (bit 0)
    pub addr0: Option<P>,
    /// Row-address line B (bit 1)
    pub addr1: Option<P>,
    /// Row-address line C (bit 2)
    pub addr2: Option<P>,
    /// Row-address line D (bit 3)
    pub addr3: Option<P>,
    /// Row-address line E (bit 4)
    pub addr4: Option<P>,
    /// Shift-register clock
    pub clock: P,
    /// Row data latch
    pub latch: P,
    /// Output enable (active low); high blanks the panel
    pub blank: P,
}

/// Error returned when the scan engine cannot be configured.
///
/// This is the only fatal error in the crate: it is raised once, by
/// [`Hub75::configure`], and the caller chooses the failure indication
/// (status LED, log, exit code). On failure the consumed pins are dropped,
/// so nothing is left claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinConfigurationError {
    /// The panel geometry requires more row-address lines than the mapping
    /// supplies.
    MissingAddressLine {
        /// Bit index of the first absent line (0 = A)
        line: u8,
    },
    /// A pin could not be driven to its idle level.
    Pin {
        /// The signal whose pin write failed
        signal: Signal,
    },
}

impl core::fmt::Display for PinConfigurationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingAddressLine { line } => {
                write!(f, "missing row-address line addr{line}")
            }
            Self::Pin { signal } => write!(f, "failed to drive {signal} to its idle level"),
        }
    }
}

impl core::error::Error for PinConfigurationError {}

/// Error returned by [`FrameBuffer`] accessors for coordinates outside the
/// panel.
///
/// Out-of-range coordinates are never silently clamped; clamping would hide
/// application bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfBounds {
    /// Rejected x coordinate
    pub x: usize,
    /// Rejected y coordinate
    pub y: usize,
}

impl core::fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pixel ({}, {}) is outside the framebuffer", self.x, self.y)
    }
}

impl core::error::Error for OutOfBounds {}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::format;

    use super::*;

    #[test]
    fn test_compute_rows() {
        assert_eq!(compute_rows(16), 8);
        assert_eq!(compute_rows(32), 16);
        assert_eq!(compute_rows(64), 32);
        assert_eq!(compute_rows(2), 1);
    }

    #[test]
    fn test_compute_planes() {
        for bits in 1..=8u8 {
            assert_eq!(compute_planes(bits), bits as usize);
        }
    }

    #[test]
    fn test_compute_address_lines() {
        assert_eq!(compute_address_lines(1), 0);
        assert_eq!(compute_address_lines(2), 1);
        assert_eq!(compute_address_lines(4), 2);
        assert_eq!(compute_address_lines(8), 3);
        assert_eq!(compute_address_lines(16), 4);
        assert_eq!(compute_address_lines(32), 5);
    }

    #[test]
    fn test_address_lines_cover_all_rows() {
        for nrows in [1usize, 2, 4, 8, 16, 32] {
            let lines = compute_address_lines(nrows);
            assert!((1 << lines) >= nrows);
            if lines > 0 {
                assert!((1 << (lines - 1)) < nrows);
            }
        }
    }

    #[test]
    fn test_helper_functions_const() {
        const ROWS: usize = 32;
        const NROWS: usize = compute_rows(ROWS);
        const BITS: u8 = 4;
        const PLANES: usize = compute_planes(BITS);
        const LINES: usize = compute_address_lines(NROWS);

        assert_eq!(NROWS, 16);
        assert_eq!(PLANES, 4);
        assert_eq!(LINES, 4);
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(format!("{}", Signal::Red1), "red1");
        assert_eq!(format!("{}", Signal::Blu2), "blu2");
        assert_eq!(format!("{}", Signal::Addr(4)), "addr4");
        assert_eq!(format!("{}", Signal::Blank), "blank");
    }

    #[test]
    fn test_error_display() {
        let missing = PinConfigurationError::MissingAddressLine { line: 3 };
        assert_eq!(format!("{missing}"), "missing row-address line addr3");

        let pin = PinConfigurationError::Pin {
            signal: Signal::Clock,
        };
        assert_eq!(format!("{pin}"), "failed to drive clock to its idle level");

        let oob = OutOfBounds { x: 64, y: 3 };
        assert_eq!(format!("{oob}"), "pixel (64, 3) is outside the framebuffer");
    }
}
