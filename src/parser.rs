//! Decoding of the two *NMEA 0183* sentences the monitor consumes: the
//! *GGA* fix sentence and the *RMC* sentence it takes its wall clock from.

use chrono::{NaiveDate, NaiveDateTime};

use err::{FixError, TimestampError};
use lexer::RawSentence;

const ABS_MAX_LAT: f64 = 90.0;
const ABS_MAX_LONG: f64 = 180.0;

// GGA field positions after splitting on `,`.
const FIELD_LAT: usize = 2;
const FIELD_LAT_DIR: usize = 3;
const FIELD_LONG: usize = 4;
const FIELD_LONG_DIR: usize = 5;
const FIELD_QUALITY: usize = 6;
const FIELD_SAT_COUNT: usize = 7;
const FIELD_ALTITUDE: usize = 9;

// RMC field positions.
const FIELD_TIME: usize = 1;
const FIELD_DATE: usize = 9;

/// The cardinal directions.
#[derive(Debug)]
enum CardDir {
    North,
    South,
    East,
    West,
}

impl CardDir {
    /// Only the exact value `"S"` selects the southern hemisphere; any
    /// other content, including an empty or missing field, reads as north.
    fn of_latitude(field: Option<&str>) -> CardDir {
        match field {
            Some("S") => CardDir::South,
            _ => CardDir::North,
        }
    }

    /// Only the exact value `"W"` selects the western hemisphere.
    fn of_longitude(field: Option<&str>) -> CardDir {
        match field {
            Some("W") => CardDir::West,
            _ => CardDir::East,
        }
    }

    #[inline]
    fn get_sign(&self) -> f64 {
        match self {
            CardDir::North | CardDir::East => 1.0,
            CardDir::South | CardDir::West => -1.0,
        }
    }
}

/// Convert a coordinate encoded as `DDDMM.MMMM` (degrees in the upper
/// digits, minutes with fraction in the remainder) to decimal degrees.
///
/// The divisor is always 100, independent of whether the degree part has
/// two digits (latitude) or three (longitude). Hemisphere sign and range
/// checks are the caller's business.
pub fn to_decimal_degrees(raw: f64) -> f64 {
    let degrees = (raw / 100.0).floor();
    degrees + (raw - degrees * 100.0) / 60.0
}

/// UTC wall-clock time and date taken from the RMC sentence.
///
/// Lives independently of the position fix: a malformed RMC sentence
/// leaves the previous value standing, and a fresh fix is always reported
/// with whatever timestamp was parsed most recently. The default value is
/// all zero, which is what a fix reported before the first RMC sentence
/// carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UtcTimestamp {
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl UtcTimestamp {
    /// Parse a `HHMMSS` time field and a `DDMMYY` date field.
    ///
    /// Each field must be at least six characters with digits throughout
    /// the consumed span; fractional seconds after the sixth character of
    /// the time field are ignored. The year is `2000 + YY`. There is no
    /// clamping and no partial take-over: any violation rejects both
    /// fields.
    pub fn parse(time: &str, date: &str) -> Result<UtcTimestamp, TimestampError> {
        let t = digit_span(time, "time")?;
        let d = digit_span(date, "date")?;
        Ok(UtcTimestamp {
            hour: pair(t, 0),
            min: pair(t, 2),
            sec: pair(t, 4),
            day: pair(d, 0),
            month: pair(d, 2),
            year: 2000 + pair(d, 4) as i32,
        })
    }

    /// Pull the time and date fields out of a classified RMC sentence.
    pub fn extract(sen: &RawSentence) -> Result<UtcTimestamp, TimestampError> {
        UtcTimestamp::parse(
            sen.field(FIELD_TIME).unwrap_or(""),
            sen.field(FIELD_DATE).unwrap_or(""),
        )
    }

    /// The chrono view of this timestamp, used for report formatting.
    /// `None` for the all-zero startup default and for field values that
    /// do not form a real calendar date.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.min, self.sec))
    }
}

fn digit_span<'a>(field: &'a str, name: &'static str) -> Result<&'a [u8], TimestampError> {
    let bytes = field.as_bytes();
    if bytes.len() < 6 {
        return Err(TimestampError::TooShort(name, bytes.len()));
    }
    let span = &bytes[..6];
    if span.iter().any(|b| !b.is_ascii_digit()) {
        return Err(TimestampError::NonDigit(name));
    }
    Ok(span)
}

#[inline]
fn pair(span: &[u8], at: usize) -> u32 {
    u32::from(span[at] - b'0') * 10 + u32::from(span[at + 1] - b'0')
}

/// A single resolved position reading, superseded by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    /// Latitude in decimal degrees, southern hemisphere negative.
    pub lat: f64,
    /// Longitude in decimal degrees, western hemisphere negative.
    pub long: f64,
    /// Antenna altitude above mean sea level in meters.
    pub altitude: f64,
    /// Quality indicator; 0 means no usable fix.
    pub quality: u8,
    /// Number of satellites used for the fix.
    pub sat_count: u32,
    /// The latitude field exactly as it appeared on the wire.
    pub raw_lat: String,
    /// The longitude field exactly as it appeared on the wire.
    pub raw_long: String,
}

impl PositionFix {
    /// Extract a fix from a classified position sentence.
    ///
    /// The latitude, longitude and altitude fields must all be non-empty,
    /// otherwise the whole extraction fails with [`FixError::NoSignal`]
    /// and the caller keeps its previous fix. A sentence with fewer fields
    /// than the protocol prescribes fails the same way instead of reading
    /// past the end. Numeric garbage in any consumed field also rejects
    /// the sentence as a whole; nothing is defaulted or zeroed.
    pub fn extract(sen: &RawSentence) -> Result<PositionFix, FixError> {
        let lat_text = expect_field!(sen, FIELD_LAT, "latitude");
        let long_text = expect_field!(sen, FIELD_LONG, "longitude");
        let alt_text = expect_field!(sen, FIELD_ALTITUDE, "altitude");

        let lat_dir = CardDir::of_latitude(sen.field(FIELD_LAT_DIR));
        let lat = parse_coord(lat_text, &lat_dir, ABS_MAX_LAT)?;

        let long_dir = CardDir::of_longitude(sen.field(FIELD_LONG_DIR));
        let long = parse_coord(long_text, &long_dir, ABS_MAX_LONG)?;

        let altitude = alt_text.parse::<f64>()?;
        let quality = expect_field!(sen, FIELD_QUALITY, "quality").parse::<u8>()?;
        let sat_count = expect_field!(sen, FIELD_SAT_COUNT, "satellite count").parse::<u32>()?;

        Ok(PositionFix {
            lat,
            long,
            altitude,
            quality,
            sat_count,
            raw_lat: lat_text.to_owned(),
            raw_long: long_text.to_owned(),
        })
    }
}

/// Parse `text` as a `DDDMM.MMMM` coordinate and apply the hemisphere
/// sign. `abs_max` is the maximum magnitude in degrees, e.g. 180 for
/// longitude.
fn parse_coord(text: &str, dir: &CardDir, abs_max: f64) -> Result<f64, FixError> {
    let dec_deg = to_decimal_degrees(text.parse::<f64>()?) * dir.get_sign();
    if dec_deg.abs() > abs_max {
        return Err(FixError::CoordRange(dec_deg, abs_max));
    }
    Ok(dec_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use err::{FixError, TimestampError};
    use lexer::RawSentence;

    const GGA: &str = "$GNGGA,141148.20,40.3815788,N,00839.48463,W,1,06,3.80,30.2,M,49.7,M,,*6E";
    const RMC: &str = "$GNRMC,152617.00,A,4038.17852,N,00839.50264,W,4.260,312.74,090817,,,A*61";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn decimal_degrees_zero_is_exact() {
        assert_eq!(to_decimal_degrees(0.0), 0.0);
    }

    #[test]
    fn decimal_degrees_two_digit_latitude() {
        assert!(close(to_decimal_degrees(4038.17852), 40.63630867));
    }

    #[test]
    fn decimal_degrees_three_digit_longitude() {
        // The divisor stays 100 even with a three-digit degree part.
        assert!(close(to_decimal_degrees(11530.0), 115.5));
        assert!(close(to_decimal_degrees(839.48463), 8.65807717));
    }

    #[test]
    fn extracts_a_complete_fix() {
        let sen = RawSentence::tokenize(GGA);
        let fix = PositionFix::extract(&sen).unwrap();
        assert_eq!(fix.quality, 1);
        assert_eq!(fix.sat_count, 6);
        assert!(close(fix.altitude, 30.2));
        assert!(close(fix.lat, to_decimal_degrees(40.3815788)));
        assert!(close(fix.long, -to_decimal_degrees(839.48463)));
        assert_eq!(fix.raw_lat, "40.3815788");
        assert_eq!(fix.raw_long, "00839.48463");
    }

    #[test]
    fn southern_and_western_hemispheres_negate() {
        let sen = RawSentence::tokenize(
            "$GNGGA,141148.20,4038.17852,S,00839.48463,W,1,06,3.80,30.2,M,49.7,M,,*6E",
        );
        let fix = PositionFix::extract(&sen).unwrap();
        assert!(fix.lat < 0.0);
        assert!(fix.long < 0.0);
    }

    #[test]
    fn other_hemisphere_values_leave_the_sign_alone() {
        // Empty and lowercase hemisphere fields read as north/east.
        for line in &[
            "$GNGGA,141148.20,4038.17852,,00839.48463,,1,06,3.80,30.2,M,49.7,M,,*6E",
            "$GNGGA,141148.20,4038.17852,s,00839.48463,w,1,06,3.80,30.2,M,49.7,M,,*6E",
        ] {
            let fix = PositionFix::extract(&RawSentence::tokenize(line)).unwrap();
            assert!(fix.lat > 0.0);
            assert!(fix.long > 0.0);
        }
    }

    #[test]
    fn empty_altitude_is_no_signal() {
        let sen = RawSentence::tokenize(
            "$GNGGA,141148.20,4038.17852,N,00839.48463,W,1,06,3.80,,M,49.7,M,,*6E",
        );
        assert_matches!(PositionFix::extract(&sen), Err(FixError::NoSignal("altitude")));
    }

    #[test]
    fn empty_latitude_is_no_signal() {
        let sen = RawSentence::tokenize(
            "$GNGGA,141148.20,,N,00839.48463,W,1,06,3.80,30.2,M,49.7,M,,*6E",
        );
        assert_matches!(PositionFix::extract(&sen), Err(FixError::NoSignal("latitude")));
    }

    #[test]
    fn short_sentence_is_no_signal_not_a_panic() {
        let sen = RawSentence::tokenize("$GNGGA,141148.20,4038.17852,N");
        assert_matches!(PositionFix::extract(&sen), Err(FixError::NoSignal(_)));
    }

    #[test]
    fn garbage_quality_rejects_the_whole_sentence() {
        let sen = RawSentence::tokenize(
            "$GNGGA,141148.20,4038.17852,N,00839.48463,W,x,06,3.80,30.2,M,49.7,M,,*6E",
        );
        assert_matches!(PositionFix::extract(&sen), Err(FixError::Int(_)));
    }

    #[test]
    fn garbage_coordinate_rejects_the_whole_sentence() {
        let sen = RawSentence::tokenize(
            "$GNGGA,141148.20,40a8.17852,N,00839.48463,W,1,06,3.80,30.2,M,49.7,M,,*6E",
        );
        assert_matches!(PositionFix::extract(&sen), Err(FixError::Float(_)));
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let sen = RawSentence::tokenize(
            "$GNGGA,141148.20,9140.00000,N,00839.48463,W,1,06,3.80,30.2,M,49.7,M,,*6E",
        );
        assert_matches!(PositionFix::extract(&sen), Err(FixError::CoordRange(_, _)));
    }

    #[test]
    fn parses_a_timestamp() {
        let ts = UtcTimestamp::parse("152617", "090817").unwrap();
        assert_eq!(
            ts,
            UtcTimestamp {
                hour: 15,
                min: 26,
                sec: 17,
                day: 9,
                month: 8,
                year: 2017,
            }
        );
    }

    #[test]
    fn fractional_seconds_are_ignored() {
        let ts = UtcTimestamp::parse("152617.00", "090817").unwrap();
        assert_eq!(ts.sec, 17);
    }

    #[test]
    fn short_fields_are_malformed() {
        assert_matches!(
            UtcTimestamp::parse("1526", "090817"),
            Err(TimestampError::TooShort("time", 4))
        );
        assert_matches!(
            UtcTimestamp::parse("152617", ""),
            Err(TimestampError::TooShort("date", 0))
        );
    }

    #[test]
    fn non_digits_are_malformed() {
        assert_matches!(
            UtcTimestamp::parse("15:617", "090817"),
            Err(TimestampError::NonDigit("time"))
        );
        assert_matches!(
            UtcTimestamp::parse("152617", "09o817"),
            Err(TimestampError::NonDigit("date"))
        );
    }

    #[test]
    fn extracts_timestamp_from_rmc() {
        let sen = RawSentence::tokenize(RMC);
        let ts = UtcTimestamp::extract(&sen).unwrap();
        assert_eq!(ts.hour, 15);
        assert_eq!(ts.day, 9);
        assert_eq!(ts.year, 2017);
    }

    #[test]
    fn default_timestamp_has_no_datetime() {
        assert_eq!(UtcTimestamp::default().to_datetime(), None);
    }

    #[test]
    fn valid_timestamp_converts_to_datetime() {
        let ts = UtcTimestamp::parse("152617", "090817").unwrap();
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.format("%-d/%-m/%Y").to_string(), "9/8/2017");
    }
}
