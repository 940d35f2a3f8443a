#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate arrayvec;
extern crate chrono;
extern crate embedded_hal;
#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;

pub mod err;
#[macro_use]
mod macros;
pub mod compass;
pub mod fusion;
pub mod heading;
pub mod lexer;
pub mod link;
pub mod parser;

pub use compass::{Gain, Hmc5883l};
pub use err::{CompassError, FixError, LinkError, TimestampError};
pub use fusion::{CycleOutcome, DisplaySnapshot, Monitor};
pub use heading::{HeadingCalculator, MagnetometerSample};
pub use lexer::{RawSentence, SentenceKind};
pub use link::LineReader;
pub use parser::{PositionFix, UtcTimestamp};
