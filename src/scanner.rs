//! HUB75 panel scanner.
//!
//! The scanner owns the connector pins and paints frames by walking an
//! explicit state machine, one scan step per [`Hub75::step`] call:
//!
//! 1. [`IdleRow`](ScanStep::IdleRow) – assert the address lines for the
//!    current row pair.
//! 2. [`ShiftingColumn`](ScanStep::ShiftingColumn) – clock the row's colour
//!    bits for the current bit-plane into the shift registers, left to
//!    right, six channels per column.
//! 3. [`Latching`](ScanStep::Latching) – pulse LAT to move the shifted data
//!    to the output drivers.
//! 4. [`Pulsing`](ScanStep::Pulsing) – enable output and report how long it
//!    must stay enabled: `lsb_pulse_ns << plane`, the Binary Code
//!    Modulation weight of the current plane. The caller performs the
//!    delay, so the transition logic itself contains no timing.
//! 5. [`AdvanceRow`](ScanStep::AdvanceRow) / [`AdvancePlane`](ScanStep::AdvancePlane)
//!    – blank the output and move to the next row; after the last row, the
//!    next plane; after the last plane the frame is complete and the
//!    machine is back at its starting state.
//!
//! Rows advance innermost and planes outermost, so a frame is painted as
//! all rows of plane 0, then all rows of plane 1, and so on.
//!
//! The panel is blanked (OE inactive) at every moment except the `Pulsing`
//! window, so shift-register churn is never visible and there is no
//! ghosting between rows.
//!
//! [`Hub75::refresh`] and [`Hub75::refresh_async`] drive the machine
//! through one full frame, sleeping the reported pulse widths through
//! `embedded-hal` (or `embedded-hal-async`) delays. The refresh loop must
//! run continuously at kHz scale; frame content updates arrive separately
//! through [`Hub75::update_frame`] at whatever cadence the application
//! likes and are swapped in at the next frame boundary, so a scan pass
//! never observes a half-updated frame.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bitplane::BitPlane;
use crate::bitplane::BitPlaneEncoder;
use crate::bitplane::Entry;
use crate::compute_address_lines;
use crate::framebuffer::FrameBuffer;
use crate::PinConfigurationError;
use crate::PinMapping;
use crate::Signal;

/// Default OE pulse width for the least-significant bit-plane.
///
/// With 4-bit colour on a 64×32 panel this yields a frame time of roughly
/// 0.3 ms of lit time per scanned row pair, comfortably above flicker
/// fusion. Tune with [`Hub75::set_lsb_pulse_ns`].
pub const DEFAULT_LSB_PULSE_NS: u32 = 1_000;

/// States of the scan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanStep {
    /// Selecting the current row pair on the address lines
    IdleRow,
    /// Clocking one row of colour bits into the shift registers
    ShiftingColumn,
    /// Transferring shifted data to the output drivers
    Latching,
    /// Output enabled for the current plane's weighted duration
    Pulsing,
    /// Output blanked again; moving to the next row
    AdvanceRow,
    /// All rows of the current plane painted; moving to the next plane
    AdvancePlane,
}

/// What a single [`Hub75::step`] call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepOutcome {
    /// More steps remain; call [`Hub75::step`] again immediately.
    Continue,
    /// Output is enabled; hold for this many nanoseconds before stepping
    /// again. This is the hard real-time edge of the engine: jitter here
    /// shows up as brightness banding.
    Pulse(u32),
    /// A full frame has been painted and the machine is back at its
    /// starting state.
    FrameComplete,
}

/// Scan position: which row and bit-plane the engine is painting, and the
/// step it will execute next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanState {
    row: usize,
    plane: usize,
    step: ScanStep,
}

impl ScanState {
    const fn start() -> Self {
        Self {
            row: 0,
            plane: 0,
            step: ScanStep::IdleRow,
        }
    }

    /// Row pair currently being painted.
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Bit-plane currently being painted.
    #[must_use]
    pub fn plane(&self) -> usize {
        self.plane
    }

    /// The step the next [`Hub75::step`] call will execute.
    #[must_use]
    pub fn step(&self) -> ScanStep {
        self.step
    }
}

/// HUB75 scan engine driving the panel through plain GPIO.
///
/// Owns the connector pins, a delay source, and two sets of bit-planes:
/// the active set the scanner streams from, and the encoder's back set
/// that [`update_frame`](Self::update_frame) writes into. The sets swap at
/// a frame boundary, so a scan pass always streams a consistent frame.
///
/// # Type Parameters
///
/// * `P` - Output pin type (use a type-erased pin for mixed pin types)
/// * `D` - Delay source: `embedded_hal::delay::DelayNs` for [`refresh`],
///   `embedded_hal_async::delay::DelayNs` for [`refresh_async`]
/// * `ROWS` - Total number of rows in the display
/// * `COLS` - Number of columns in the display
/// * `NROWS` - Number of rows processed in parallel ([`compute_rows`])
/// * `BITS` - Number of bits per colour channel
/// * `PLANE_COUNT` - Number of bit-planes ([`compute_planes`])
///
/// [`refresh`]: Self::refresh
/// [`refresh_async`]: Self::refresh_async
/// [`compute_rows`]: crate::compute_rows
/// [`compute_planes`]: crate::compute_planes
pub struct Hub75<
    P,
    D,
    const ROWS: usize,
    const COLS: usize,
    const NROWS: usize,
    const BITS: u8,
    const PLANE_COUNT: usize,
> where
    P: OutputPin,
{
    red1: P,
    grn1: P,
    blu1: P,
    red2: P,
    grn2: P,
    blu2: P,
    addr: [Option<P>; 5],
    clock: P,
    latch: P,
    blank: P,
    delay: D,
    encoder: BitPlaneEncoder<ROWS, COLS, NROWS, BITS, PLANE_COUNT>,
    active: [BitPlane<COLS, NROWS>; PLANE_COUNT],
    pending: bool,
    state: ScanState,
    blanked: bool,
    lsb_pulse_ns: u32,
}

fn idle<P: OutputPin>(pin: &mut P, signal: Signal) -> Result<(), PinConfigurationError> {
    pin.set_low()
        .map_err(|_| PinConfigurationError::Pin { signal })
}

impl<
        P,
        D,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const BITS: u8,
        const PLANE_COUNT: usize,
    > Hub75<P, D, ROWS, COLS, NROWS, BITS, PLANE_COUNT>
where
    P: OutputPin,
{
    const ADDR_LINES: usize = compute_address_lines(NROWS);

    /// Claim the mapped pins and drive every signal to its idle level:
    /// output blanked, clock and latch low, address lines low, colour
    /// lines low.
    ///
    /// GPIO writes are treated as infallible once this succeeds; the scan
    /// path never reports pin errors.
    ///
    /// # Errors
    ///
    /// [`PinConfigurationError::MissingAddressLine`] if the mapping lacks
    /// an address line the panel geometry requires, or
    /// [`PinConfigurationError::Pin`] if a pin write fails. Either way the
    /// consumed pins are dropped and nothing is left claimed.
    ///
    /// # Panics
    ///
    /// Panics if the const parameters are inconsistent
    /// (`NROWS * 2 != ROWS`, `PLANE_COUNT != BITS`, or `BITS` outside
    /// `1..=8`).
    pub fn configure(pins: PinMapping<P>, delay: D) -> Result<Self, PinConfigurationError> {
        assert!(BITS >= 1);
        assert!(BITS <= 8);
        assert!(PLANE_COUNT == BITS as usize);
        assert!(NROWS * 2 == ROWS);
        assert!(Self::ADDR_LINES <= 5);

        let PinMapping {
            red1,
            grn1,
            blu1,
            red2,
            grn2,
            blu2,
            addr0,
            addr1,
            addr2,
            addr3,
            addr4,
            clock,
            latch,
            blank,
        } = pins;
        let addr = [addr0, addr1, addr2, addr3, addr4];

        for (line, pin) in addr.iter().enumerate().take(Self::ADDR_LINES) {
            if pin.is_none() {
                return Err(PinConfigurationError::MissingAddressLine { line: line as u8 });
            }
        }

        let mut this = Self {
            red1,
            grn1,
            blu1,
            red2,
            grn2,
            blu2,
            addr,
            clock,
            latch,
            blank,
            delay,
            encoder: BitPlaneEncoder::new(),
            active: [BitPlane::new(); PLANE_COUNT],
            pending: false,
            state: ScanState::start(),
            blanked: false,
            lsb_pulse_ns: DEFAULT_LSB_PULSE_NS,
        };
        this.idle_levels()?;

        #[cfg(feature = "log")]
        log::debug!(
            "configured {}x{} panel: {} bit planes, {} address lines",
            COLS,
            ROWS,
            PLANE_COUNT,
            Self::ADDR_LINES
        );

        Ok(this)
    }

    fn idle_levels(&mut self) -> Result<(), PinConfigurationError> {
        self.blank
            .set_high()
            .map_err(|_| PinConfigurationError::Pin {
                signal: Signal::Blank,
            })?;
        idle(&mut self.red1, Signal::Red1)?;
        idle(&mut self.grn1, Signal::Grn1)?;
        idle(&mut self.blu1, Signal::Blu1)?;
        idle(&mut self.red2, Signal::Red2)?;
        idle(&mut self.grn2, Signal::Grn2)?;
        idle(&mut self.blu2, Signal::Blu2)?;
        idle(&mut self.clock, Signal::Clock)?;
        idle(&mut self.latch, Signal::Latch)?;
        for (line, pin) in self.addr.iter_mut().enumerate() {
            if let Some(pin) = pin {
                idle(pin, Signal::Addr(line as u8))?;
            }
        }
        Ok(())
    }

    /// Encode a new frame into the back planes.
    ///
    /// The scanner keeps streaming the previous frame until it crosses the
    /// next frame boundary, then swaps the new planes in, so a scan pass
    /// never observes a torn mix of old and new pixels. May be called at
    /// any cadence; calling it twice between frame boundaries simply
    /// replaces the pending frame.
    pub fn update_frame(&mut self, fb: &FrameBuffer<ROWS, COLS>) {
        self.encoder.encode(fb);
        self.pending = true;
    }

    /// Manually blank the panel.
    ///
    /// While blanked the scanner keeps running with unchanged step timing,
    /// but output enable is forced inactive regardless of the `Pulsing`
    /// step, useful before the first valid frame is ready. Unblanking
    /// takes effect at the next `Pulsing` step.
    ///
    /// # Panics
    ///
    /// Panics if the blank pin write fails (GPIO is infallible by contract
    /// after [`configure`](Self::configure)).
    pub fn set_blank(&mut self, blanked: bool) {
        self.blanked = blanked;
        if blanked {
            self.blank.set_high().unwrap();
        }
    }

    /// Whether the panel is manually blanked.
    #[must_use]
    pub fn is_blanked(&self) -> bool {
        self.blanked
    }

    /// Set the OE pulse width of the least-significant bit-plane.
    ///
    /// Plane `i` is lit for `ns << i`, so this single knob scales overall
    /// brightness and frame time together.
    pub fn set_lsb_pulse_ns(&mut self, ns: u32) {
        self.lsb_pulse_ns = ns;
    }

    /// The configured least-significant-plane pulse width.
    #[must_use]
    pub fn lsb_pulse_ns(&self) -> u32 {
        self.lsb_pulse_ns
    }

    /// Current scan position.
    #[must_use]
    pub fn scan_state(&self) -> ScanState {
        self.state
    }

    /// Execute one scan step and advance the state machine.
    ///
    /// On [`StepOutcome::Pulse`] the caller must keep output enabled for
    /// the returned duration before stepping again;
    /// [`refresh`](Self::refresh) does exactly that with the engine's
    /// delay source. All other outcomes may be followed immediately.
    ///
    /// # Panics
    ///
    /// Panics if a pin write fails (GPIO is infallible by contract after
    /// [`configure`](Self::configure)).
    pub fn step(&mut self) -> StepOutcome {
        match self.state.step {
            ScanStep::IdleRow => {
                if self.state.row == 0 && self.state.plane == 0 && self.pending {
                    core::mem::swap(&mut self.active, self.encoder.planes_mut());
                    self.pending = false;
                }
                self.set_address(self.state.row as u8);
                self.state.step = ScanStep::ShiftingColumn;
                StepOutcome::Continue
            }
            ScanStep::ShiftingColumn => {
                for col in 0..COLS {
                    let entry = self.active[self.state.plane].entry(self.state.row, col);
                    self.clock_in(entry);
                }
                self.state.step = ScanStep::Latching;
                StepOutcome::Continue
            }
            ScanStep::Latching => {
                self.pulse_latch();
                self.state.step = ScanStep::Pulsing;
                StepOutcome::Continue
            }
            ScanStep::Pulsing => {
                if !self.blanked {
                    self.blank.set_low().unwrap();
                }
                self.state.step = ScanStep::AdvanceRow;
                StepOutcome::Pulse(self.lsb_pulse_ns << self.state.plane)
            }
            ScanStep::AdvanceRow => {
                self.blank.set_high().unwrap();
                self.state.row += 1;
                if self.state.row == NROWS {
                    self.state.row = 0;
                    self.state.step = ScanStep::AdvancePlane;
                } else {
                    self.state.step = ScanStep::IdleRow;
                }
                StepOutcome::Continue
            }
            ScanStep::AdvancePlane => {
                self.state.plane += 1;
                self.state.step = ScanStep::IdleRow;
                if self.state.plane == PLANE_COUNT {
                    self.state.plane = 0;
                    StepOutcome::FrameComplete
                } else {
                    StepOutcome::Continue
                }
            }
        }
    }

    fn set_address(&mut self, addr: u8) {
        for (line, pin) in self.addr.iter_mut().enumerate() {
            if let Some(pin) = pin {
                pin.set_state(((addr >> line) & 1 != 0).into()).unwrap();
            }
        }
    }

    fn clock_in(&mut self, entry: Entry) {
        self.red1.set_state(entry.red1().into()).unwrap();
        self.grn1.set_state(entry.grn1().into()).unwrap();
        self.blu1.set_state(entry.blu1().into()).unwrap();
        self.red2.set_state(entry.red2().into()).unwrap();
        self.grn2.set_state(entry.grn2().into()).unwrap();
        self.blu2.set_state(entry.blu2().into()).unwrap();
        self.clock.set_high().unwrap();
        self.clock.set_low().unwrap();
    }

    fn pulse_latch(&mut self) {
        self.latch.set_high().unwrap();
        self.latch.set_low().unwrap();
    }
}

impl<
        P,
        D,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const BITS: u8,
        const PLANE_COUNT: usize,
    > Hub75<P, D, ROWS, COLS, NROWS, BITS, PLANE_COUNT>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Paint one full frame, blocking through the engine's delay source
    /// for every OE pulse.
    ///
    /// Call in a tight loop; each call returns after `FrameComplete`.
    ///
    /// # Panics
    ///
    /// Panics if a pin write fails (GPIO is infallible by contract after
    /// [`configure`](Self::configure)).
    pub fn refresh(&mut self) {
        loop {
            match self.step() {
                StepOutcome::Continue => {}
                StepOutcome::Pulse(ns) => self.delay.delay_ns(ns),
                StepOutcome::FrameComplete => break,
            }
        }
    }
}

impl<
        P,
        D,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const BITS: u8,
        const PLANE_COUNT: usize,
    > Hub75<P, D, ROWS, COLS, NROWS, BITS, PLANE_COUNT>
where
    P: OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Paint one full frame, awaiting the engine's delay source for every
    /// OE pulse.
    ///
    /// The async twin of [`refresh`](Self::refresh): identical pin
    /// sequence, but pulse waits yield to the executor.
    ///
    /// # Panics
    ///
    /// Panics if a pin write fails (GPIO is infallible by contract after
    /// [`configure`](Self::configure)).
    pub async fn refresh_async(&mut self) {
        loop {
            match self.step() {
                StepOutcome::Continue => {}
                StepOutcome::Pulse(ns) => self.delay.delay_ns(ns).await,
                StepOutcome::FrameComplete => break,
            }
        }
    }
}
