//! Driver for the HMC5883L 3-axis digital compass.
//!
//! The device sits on an I2C bus and exposes two configuration registers,
//! a mode register, six data registers in X, Z, Y order with the high
//! byte at the lower address, and a status register with a ready and a
//! lock flag. Access goes through [`embedded_hal::i2c::I2c`], so the
//! driver runs against any bus implementation, including a fake one in
//! tests.

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

use err::CompassError;

/// Factory I2C address of the device.
pub const I2C_ADDRESS: u8 = 0x1E;

/// Register addresses
pub mod registers {
    pub const CRA: u8 = 0x00;
    pub const CRB: u8 = 0x01;
    pub const MODE: u8 = 0x02;
    pub const OUT_X_H: u8 = 0x03;
    pub const OUT_X_L: u8 = 0x04;
    pub const OUT_Z_H: u8 = 0x05;
    pub const OUT_Z_L: u8 = 0x06;
    pub const OUT_Y_H: u8 = 0x07;
    pub const OUT_Y_L: u8 = 0x08;
    pub const STATUS: u8 = 0x09;
}

/// Status register flags.
pub const STATUS_READY: u8 = 0x01;
pub const STATUS_LOCK: u8 = 0x02;

// Configuration A: 8-sample averaging, 15 Hz output, normal measurement
// or positive-bias self test.
const CRA_NORMAL: u8 = 0x70;
const CRA_SELF_TEST: u8 = 0x71;
// Mode register: continuous-measurement mode.
const MODE_CONTINUOUS: u8 = 0x00;

const CONVERSION_WAIT: Duration = Duration::from_millis(1);

/// The seven sensitivity ranges of the device.
///
/// Each range carries its configuration register code and the fixed
/// counts-per-gauss and scale constants from the datasheet. The table is
/// immutable; the values selected for the active gain travel inside
/// [`HeadingCalculator`](::heading::HeadingCalculator) instead of any
/// device-global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Gain {
    /// ±1.3 gauss
    G1_3,
    /// ±1.9 gauss
    G1_9,
    /// ±2.5 gauss
    G2_5,
    /// ±4.0 gauss
    G4_0,
    /// ±4.7 gauss
    G4_7,
    /// ±5.6 gauss
    G5_6,
    /// ±8.1 gauss
    G8_1,
}

impl Gain {
    /// Configuration register B value selecting this range.
    pub fn code(&self) -> u8 {
        match self {
            Gain::G1_3 => 0x20,
            Gain::G1_9 => 0x40,
            Gain::G2_5 => 0x60,
            Gain::G4_0 => 0x80,
            Gain::G4_7 => 0xA0,
            Gain::G5_6 => 0xC0,
            Gain::G8_1 => 0xE0,
        }
    }

    /// Counts per gauss for the X/Y axes and the Z axis at this range.
    pub fn lsb_per_gauss(&self) -> (f32, f32) {
        match self {
            Gain::G1_3 => (1090.0, 980.0),
            Gain::G1_9 => (820.0, 760.0),
            Gain::G2_5 => (660.0, 600.0),
            Gain::G4_0 => (440.0, 400.0),
            Gain::G4_7 => (390.0, 255.0),
            Gain::G5_6 => (330.0, 295.0),
            Gain::G8_1 => (230.0, 205.0),
        }
    }

    /// Digital resolution in milli-gauss per count at this range.
    pub fn scale(&self) -> f32 {
        match self {
            Gain::G1_3 => 0.92,
            Gain::G1_9 => 1.22,
            Gain::G2_5 => 1.52,
            Gain::G4_0 => 2.27,
            Gain::G4_7 => 2.56,
            Gain::G5_6 => 3.03,
            Gain::G8_1 => 4.35,
        }
    }

    /// The next less sensitive range, if any.
    fn next_up(&self) -> Option<Gain> {
        match self {
            Gain::G1_3 => Some(Gain::G1_9),
            Gain::G1_9 => Some(Gain::G2_5),
            Gain::G2_5 => Some(Gain::G4_0),
            Gain::G4_0 => Some(Gain::G4_7),
            Gain::G4_7 => Some(Gain::G5_6),
            Gain::G5_6 => Some(Gain::G8_1),
            Gain::G8_1 => None,
        }
    }

    /// Positive-bias self-test limits for the ranges the test runs at.
    fn self_test_limits(&self) -> (i16, i16) {
        match self {
            Gain::G5_6 => (206, 487),
            Gain::G8_1 => (143, 339),
            _ => (243, 575),
        }
    }
}

/// The compass device itself.
pub struct Hmc5883l<I2C> {
    i2c: I2C,
    address: u8,
    gain: Gain,
}

impl<I2C: I2c> Hmc5883l<I2C> {
    /// Wrap a bus handle for a device at the factory address.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, I2C_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Hmc5883l {
            i2c,
            address,
            gain: Gain::G1_3,
        }
    }

    /// Configure the device for continuous measurement at the default
    /// ±1.3 gauss range. Returns the configured gain so the caller can
    /// seed its heading calculator with the matching scale constants.
    pub fn init(&mut self) -> Result<Gain, CompassError> {
        self.write_register(registers::CRA, CRA_NORMAL)?;
        thread::sleep(CONVERSION_WAIT);
        let gain = self.set_gain(Gain::G1_3)?;
        self.write_register(registers::MODE, MODE_CONTINUOUS)?;
        Ok(gain)
    }

    /// Select a sensitivity range. Returns the new gain; the caller is
    /// responsible for carrying it into its heading calculator.
    pub fn set_gain(&mut self, gain: Gain) -> Result<Gain, CompassError> {
        self.write_register(registers::CRB, gain.code())?;
        self.gain = gain;
        Ok(gain)
    }

    /// The currently configured sensitivity range.
    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Read the status register.
    pub fn status(&mut self) -> Result<u8, CompassError> {
        self.read_register(registers::STATUS)
    }

    /// Read one raw axis triple.
    ///
    /// Data is only taken over when the status register reads the ready
    /// flag alone; ready combined with the lock flag counts as stale and
    /// fails with [`CompassError::Stale`], leaving the caller to reuse
    /// its previous sample.
    pub fn read_raw(&mut self) -> Result<[i16; 3], CompassError> {
        let status = self.status()?;
        if status != STATUS_READY {
            return Err(CompassError::Stale(status));
        }

        let x0 = self.read_register(registers::OUT_X_L)?;
        let x1 = self.read_register(registers::OUT_X_H)?;
        let z0 = self.read_register(registers::OUT_Z_L)?;
        let z1 = self.read_register(registers::OUT_Z_H)?;
        let y0 = self.read_register(registers::OUT_Y_L)?;
        let y1 = self.read_register(registers::OUT_Y_H)?;

        Ok([combine(x0, x1), combine(y0, y1), combine(z0, z1)])
    }

    /// Run the positive-bias self test.
    ///
    /// The test starts at the ±4.7 gauss range and expects every axis
    /// within the datasheet limits for that range. An axis outside the
    /// limits escalates to the next range with its own limits; running
    /// out of ranges fails with [`CompassError::SelfTest`]. On success
    /// the device is put back into normal measurement mode, but keeps
    /// the escalated gain, which the caller must take over.
    pub fn self_test(&mut self) -> Result<Gain, CompassError> {
        self.write_register(registers::CRA, CRA_SELF_TEST)?;
        self.set_gain(Gain::G4_7)?;
        self.write_register(registers::MODE, MODE_CONTINUOUS)?;

        loop {
            thread::sleep(CONVERSION_WAIT);
            let raw = self.read_raw()?;
            let (low, high) = self.gain.self_test_limits();
            let within = |v: i16| v >= low && v <= high;

            if within(raw[0]) && within(raw[1]) && within(raw[2]) {
                self.write_register(registers::CRA, CRA_NORMAL)?;
                return Ok(self.gain);
            }

            match self.gain.next_up() {
                Some(gain) => {
                    info!("self test out of limits, adjusting gain to {:?}", gain);
                    self.set_gain(gain)?;
                }
                None => return Err(CompassError::SelfTest(raw[0], raw[1], raw[2])),
            }
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), CompassError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|_| CompassError::Bus("register write"))
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, CompassError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|_| CompassError::Bus("register read"))?;
        Ok(buf[0])
    }
}

/// Combine a little-first register pair into a signed 16-bit value.
#[inline]
fn combine(low: u8, high: u8) -> i16 {
    i16::from(low) | (i16::from(high) << 8)
}


#[cfg(test)]
mod tests {
    use super::testbus::FakeBus;
    use super::*;
    use err::CompassError;

    #[test]
    fn init_configures_measurement_and_gain() {
        let mut compass = Hmc5883l::new(FakeBus::new());
        let gain = compass.init().unwrap();
        assert_eq!(gain, Gain::G1_3);
        assert_eq!(
            compass.i2c.writes,
            vec![
                (registers::CRA, 0x70),
                (registers::CRB, Gain::G1_3.code()),
                (registers::MODE, 0x00),
            ]
        );
    }

    #[test]
    fn read_combines_register_pairs() {
        let mut compass = Hmc5883l::new(FakeBus::with_sample(1090, -1, 256));
        assert_eq!(compass.read_raw().unwrap(), [1090, -1, 256]);
    }

    #[test]
    fn ready_with_lock_is_stale() {
        let mut bus = FakeBus::with_sample(100, 100, 100);
        bus.regs[registers::STATUS as usize] = STATUS_READY | STATUS_LOCK;
        let mut compass = Hmc5883l::new(bus);
        assert_matches!(compass.read_raw(), Err(CompassError::Stale(0x03)));
    }

    #[test]
    fn not_ready_is_stale() {
        let mut bus = FakeBus::with_sample(100, 100, 100);
        bus.regs[registers::STATUS as usize] = 0x00;
        let mut compass = Hmc5883l::new(bus);
        assert_matches!(compass.read_raw(), Err(CompassError::Stale(0x00)));
    }

    #[test]
    fn self_test_passes_within_limits() {
        let mut compass = Hmc5883l::new(FakeBus::with_sample(400, 300, 500));
        assert_eq!(compass.self_test().unwrap(), Gain::G4_7);
        // Back in normal measurement mode afterwards.
        assert_eq!(
            compass.i2c.regs[registers::CRA as usize],
            0x70,
        );
    }

    #[test]
    fn self_test_escalates_gain_for_low_counts() {
        // 220 is below the ±4.7 gauss limits but inside the ±5.6 ones.
        let mut compass = Hmc5883l::new(FakeBus::with_sample(220, 220, 220));
        assert_eq!(compass.self_test().unwrap(), Gain::G5_6);
        assert_eq!(
            compass.i2c.regs[registers::CRB as usize],
            Gain::G5_6.code(),
        );
    }

    #[test]
    fn self_test_fails_when_gains_run_out() {
        let mut compass = Hmc5883l::new(FakeBus::with_sample(100, 100, 100));
        assert_matches!(
            compass.self_test(),
            Err(CompassError::SelfTest(100, 100, 100))
        );
    }
}
