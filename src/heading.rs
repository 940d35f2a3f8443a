//! Turns raw magnetometer counts into a calibrated compass heading.

use std::f32::consts::PI;

use compass::Gain;

/// Conversion factor from gauss to micro-tesla.
pub const GAUSS_TO_MICROTESLA: f32 = 100.0;

/// One decoded magnetometer read.
///
/// Recomputed on every cycle; the previous sample is simply dropped, or
/// kept as-is when the device had nothing fresh to offer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MagnetometerSample {
    /// Raw counts as read from the data registers.
    pub raw: [i16; 3],
    /// Raw counts times the per-range scale factor. Diagnostic only; the
    /// heading is computed from the field components below.
    pub scaled: [f32; 3],
    /// Magnetic field components in micro-tesla.
    pub field: [f32; 3],
    /// Heading in radians, normalized into `[0, 2π)`.
    pub heading_rad: f32,
    /// Heading in degrees, normalized into `[0, 360)`.
    pub heading_deg: f32,
}

/// Converts raw axis counts into a declination-corrected heading.
///
/// The counts-per-gauss constants are selected by the configured gain
/// from an immutable lookup table and carried here by value; changing
/// the device gain means handing the new [`Gain`] to [`set_gain`].
///
/// [`set_gain`]: #method.set_gain
#[derive(Debug, Clone, Copy)]
pub struct HeadingCalculator {
    gain: Gain,
    declination: f32,
}

impl HeadingCalculator {
    /// `declination` is the local correction angle between magnetic and
    /// true north, in radians.
    pub fn new(gain: Gain, declination: f32) -> HeadingCalculator {
        HeadingCalculator { gain, declination }
    }

    /// Take over the gain after a device-side range change.
    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Compute the full sample for one raw axis triple.
    pub fn compute(&self, raw: [i16; 3]) -> MagnetometerSample {
        let (lsb_xy, lsb_z) = self.gain.lsb_per_gauss();
        let scale = self.gain.scale();

        let scaled = [
            f32::from(raw[0]) * scale,
            f32::from(raw[1]) * scale,
            f32::from(raw[2]) * scale,
        ];
        let field = [
            f32::from(raw[0]) / lsb_xy * GAUSS_TO_MICROTESLA,
            f32::from(raw[1]) / lsb_xy * GAUSS_TO_MICROTESLA,
            f32::from(raw[2]) / lsb_z * GAUSS_TO_MICROTESLA,
        ];

        let mut heading = field[1].atan2(field[0]);

        // TODO: a negative declination is never applied; accepting one
        // needs an add-if-nonzero rule here and in the calibration docs.
        if self.declination > 0.0 {
            heading += self.declination;
        }

        heading = normalize(heading);

        MagnetometerSample {
            raw,
            scaled,
            field,
            heading_rad: heading,
            heading_deg: heading.to_degrees(),
        }
    }
}

/// Fold `heading` into `[0, 2π)` with at most one correction in either
/// direction. Values more than a full turn out of range are not expected
/// from `atan2` plus a single declination term and stay as they are.
fn normalize(heading: f32) -> f32 {
    if heading < 0.0 {
        heading + 2.0 * PI
    } else if heading >= 2.0 * PI {
        heading - 2.0 * PI
    } else {
        heading
    }
}
