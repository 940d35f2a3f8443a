#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate sextant;

use sextant::{PositionFix, RawSentence, SentenceKind, UtcTimestamp};

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    let sen = RawSentence::tokenize(&line);

    match sen.classify() {
        Some(SentenceKind::Position) => {
            let _ = PositionFix::extract(&sen);
        }
        Some(SentenceKind::Timestamp) => {
            let _ = UtcTimestamp::extract(&sen);
        }
        None => (),
    }
});
