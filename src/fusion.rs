//! The polling cycle that merges GPS sentences with compass headings.

use std::fmt;
use std::io;

use embedded_hal::i2c::I2c;

use compass::Hmc5883l;
use err::{CompassError, FixError, LinkError};
use heading::{HeadingCalculator, MagnetometerSample};
use lexer::{RawSentence, SentenceKind};
use link::LineReader;
use parser::{PositionFix, UtcTimestamp};

/// What a single cycle produced.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A position sentence was decoded; show the merged snapshot.
    Report(DisplaySnapshot),
    /// A position sentence arrived without usable coordinates.
    NoSignal,
    /// A timestamp-only update, unclassified traffic or an empty line.
    Quiet,
}

/// The latest fix, wall clock and heading, assembled for presentation.
///
/// Owns nothing beyond the cycle that produced it; the next report
/// simply replaces it.
#[derive(Debug, Clone)]
pub struct DisplaySnapshot {
    pub fix: PositionFix,
    pub clock: UtcTimestamp,
    pub sample: MagnetometerSample,
}

impl fmt::Display for DisplaySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "GPS DATA:")?;
        writeln!(f, "Latitude (Deg.M): {}", self.fix.raw_lat)?;
        writeln!(f, "Longitude (Deg.M): {}", self.fix.raw_long)?;
        writeln!(f, "-------------------")?;
        writeln!(f, "Latitude (deg) : {:.7}", self.fix.lat)?;
        writeln!(f, "Longitude (deg): {:.7}", self.fix.long)?;
        writeln!(f, "Altitude (m)   : {}", self.fix.altitude)?;
        match self.clock.to_datetime() {
            Some(dt) => writeln!(
                f,
                "Time and Date: {} UTC",
                dt.format("%-H:%-M:%-S %-d/%-m/%Y")
            )?,
            None => writeln!(f, "Time and Date: unavailable")?,
        }
        writeln!(f, "FixType: {}", self.fix.quality)?;
        writeln!(f, "SatNum: {}", self.fix.sat_count)?;
        writeln!(f)?;
        writeln!(f, "Compass DATA:")?;
        writeln!(f, "Heading (deg): {:.1}", self.sample.heading_deg)
    }
}

/// Polls the positioning link and the compass and merges both streams.
///
/// Fully sequential: each cycle reads exactly one line (blocking) and
/// triggers exactly one compass read before any parsing happens, so
/// there is no shared state to guard. The two reads are deliberately not
/// synchronized to the same instant; the heading always reflects the
/// most recent device sample. A link that falls silent stalls the
/// monitor in the blocking line read until traffic resumes.
pub struct Monitor<R, I2C> {
    link: LineReader<R>,
    compass: Hmc5883l<I2C>,
    calculator: HeadingCalculator,
    fix: Option<PositionFix>,
    clock: UtcTimestamp,
    sample: MagnetometerSample,
}

impl<R: io::Read, I2C: I2c> Monitor<R, I2C> {
    /// `input` must be the already-configured positioning channel; the
    /// compass is expected to be initialized.
    pub fn new(input: R, compass: Hmc5883l<I2C>, calculator: HeadingCalculator) -> Self {
        Monitor {
            link: LineReader::new(input),
            compass,
            calculator,
            fix: None,
            clock: UtcTimestamp::default(),
            sample: MagnetometerSample::default(),
        }
    }

    /// Run one acquire/route cycle.
    ///
    /// Only link-level failures surface as `Err`; everything that can go
    /// wrong with sentence content is folded into the outcome, with the
    /// previous fix, clock and heading retained.
    pub fn cycle(&mut self) -> Result<CycleOutcome, LinkError> {
        let line = self.link.read_line()?;
        self.poll_compass();
        Ok(self.route(&line))
    }

    /// The most recently extracted fix, if any sentence produced one yet.
    pub fn current_fix(&self) -> Option<&PositionFix> {
        self.fix.as_ref()
    }

    /// The most recently parsed wall-clock value.
    pub fn clock(&self) -> UtcTimestamp {
        self.clock
    }

    /// The most recent fresh compass sample.
    pub fn sample(&self) -> MagnetometerSample {
        self.sample
    }

    /// Trigger one compass read. A stale sample is reused silently; bus
    /// trouble is logged and otherwise treated the same way.
    fn poll_compass(&mut self) {
        match self.compass.read_raw() {
            Ok(raw) => self.sample = self.calculator.compute(raw),
            Err(CompassError::Stale(_)) => (),
            Err(e) => warn!("compass read failed: {}", e),
        }
    }

    fn route(&mut self, line: &str) -> CycleOutcome {
        let sen = RawSentence::tokenize(line);
        match sen.classify() {
            Some(SentenceKind::Timestamp) => {
                self.update_clock(&sen);
                CycleOutcome::Quiet
            }
            Some(SentenceKind::Position) => self.update_fix(&sen),
            None => CycleOutcome::Quiet,
        }
    }

    /// A malformed timestamp never partially overwrites the clock.
    fn update_clock(&mut self, sen: &RawSentence) {
        match UtcTimestamp::extract(sen) {
            Ok(ts) => self.clock = ts,
            Err(e) => warn!("malformed timestamp: {}", e),
        }
    }

    fn update_fix(&mut self, sen: &RawSentence) -> CycleOutcome {
        match PositionFix::extract(sen) {
            Ok(fix) => {
                self.fix = Some(fix.clone());
                CycleOutcome::Report(DisplaySnapshot {
                    fix,
                    clock: self.clock,
                    sample: self.sample,
                })
            }
            Err(FixError::NoSignal(field)) => {
                debug!("position sentence without {}", field);
                CycleOutcome::NoSignal
            }
            Err(e) => {
                warn!("unusable position sentence: {}", e);
                CycleOutcome::NoSignal
            }
        }
    }
}
