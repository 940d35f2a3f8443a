use arrayvec::CapacityError;
use std::{io, num};

quick_error! {
    /// Errors of the serial line reader.
    #[derive(Debug)]
    pub enum LinkError {
        Io(err: io::Error) {
            from()
            description(err.description())
            display("Encountered I/O error while reading from the link: {}", err)
            cause(err)
        }
        LineOverflow(err: CapacityError<u8>, capacity: usize) {
            description(err.description())
            display("Line exceeded the {} byte buffer: {}", capacity, err)
            cause(err)
        }
        Eof {
            description("Unexpected EOF")
            display("Link closed before a line was read")
        }
    }
}

// Quick error can't handle from for tuples
impl From<(CapacityError<u8>, usize)> for LinkError {
    fn from((e, cap): (CapacityError<u8>, usize)) -> Self {
        LinkError::LineOverflow(e, cap)
    }
}

quick_error! {
    /// Reasons a position sentence did not yield a usable fix.
    ///
    /// None of these invalidate a previously extracted fix; the caller
    /// keeps its last good value and reports this cycle as signal-less.
    #[derive(Debug)]
    pub enum FixError {
        NoSignal(field: &'static str) {
            description("No valid GPS signal")
            display("Required field \"{}\" is empty or missing", field)
        }
        Float(err: num::ParseFloatError) {
            from()
            description(err.description())
            display("{}", err)
            cause(err)
        }
        Int(err: num::ParseIntError) {
            from()
            description(err.description())
            display("{}", err)
            cause(err)
        }
        CoordRange(val: f64, max: f64) {
            description("Invalid coordinate")
            display("Invalid coordinate: {} should be between {} and {}", val, max*-1.0, max)
        }
    }
}

quick_error! {
    /// A time or date field that could not be taken over.
    #[derive(Debug)]
    pub enum TimestampError {
        TooShort(field: &'static str, len: usize) {
            description("Timestamp field too short")
            display("The {} field is {} characters long, expected at least 6", field, len)
        }
        NonDigit(field: &'static str) {
            description("Timestamp field contains non-digits")
            display("The {} field contains non-digit characters", field)
        }
    }
}

quick_error! {
    /// Compass device errors.
    #[derive(Debug)]
    pub enum CompassError {
        Bus(op: &'static str) {
            description("I2C transfer failed")
            display("I2C transfer failed during {}", op)
        }
        Stale(status: u8) {
            description("Sample not ready")
            display("Status register reads {:#04x}, expected the ready flag alone", status)
        }
        SelfTest(x: i16, y: i16, z: i16) {
            description("Self test out of limits")
            display("Self test failed at maximum gain with counts x={} y={} z={}", x, y, z)
        }
    }
}
