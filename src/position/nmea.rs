//! NMEA 0183 sentence decoding
//!
//! Only two sentence types matter to the logger: GGA carries the position
//! solution, RMC carries the UTC date and time. Everything else is skipped
//! without being parsed.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use nmea0183::{ParseResult, Parser};
use thiserror::Error;

use super::Coordinates;

/// What a single line contributed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sentence {
    /// GGA with a valid position solution
    Fix(Coordinates),
    /// GGA or RMC explicitly reporting no solution
    NoSolution,
    /// RMC with a valid date and time
    Time(DateTime<Utc>),
    /// Well-formed NMEA of a type the logger does not use
    Other,
}

/// Reasons a line could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NmeaError {
    #[error("not an NMEA sentence")]
    NotNmea,

    #[error("rejected: {0}")]
    Rejected(&'static str),

    #[error("sentence incomplete")]
    Incomplete,

    #[error("invalid date or time")]
    InvalidTime,
}

/// Line-at-a-time decoder for GGA and RMC sentences
pub struct NmeaDecoder {
    parser: Parser,
}

impl NmeaDecoder {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Decode one line (terminator already stripped)
    ///
    /// Checksums are verified by the parser; a line with a bad checksum is
    /// `Rejected` and must not change the stored fix.
    pub fn decode(&mut self, line: &str) -> Result<Sentence, NmeaError> {
        let line = line.trim();
        if !line.starts_with('$') || line.len() < 6 {
            return Err(NmeaError::NotNmea);
        }

        match line.get(3..6) {
            Some("GGA") | Some("RMC") => {}
            Some(_) => return Ok(Sentence::Other),
            None => return Err(NmeaError::NotNmea),
        }

        let mut outcome = None;
        for b in line.bytes().chain(*b"\r\n") {
            if let Some(result) = self.parser.parse_from_byte(b) {
                outcome = Some(result);
            }
        }

        match outcome {
            Some(Ok(ParseResult::GGA(Some(gga)))) => Ok(Sentence::Fix(Coordinates {
                latitude: gga.latitude.as_f64(),
                longitude: gga.longitude.as_f64(),
            })),
            Some(Ok(ParseResult::GGA(None))) | Some(Ok(ParseResult::RMC(None))) => {
                Ok(Sentence::NoSolution)
            }
            Some(Ok(ParseResult::RMC(Some(rmc)))) => {
                let date = &rmc.datetime.date;
                let time = &rmc.datetime.time;
                utc_from_parts(
                    i32::from(date.year),
                    u32::from(date.month),
                    u32::from(date.day),
                    u32::from(time.hours),
                    u32::from(time.minutes),
                    f64::from(time.seconds),
                )
                .map(Sentence::Time)
                .ok_or(NmeaError::InvalidTime)
            }
            Some(Ok(_)) => Ok(Sentence::Other),
            Some(Err(msg)) => Err(NmeaError::Rejected(msg)),
            None => Err(NmeaError::Incomplete),
        }
    }
}

impl Default for NmeaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn utc_from_parts(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    seconds: f64,
) -> Option<DateTime<Utc>> {
    if !(0.0..61.0).contains(&seconds) {
        return None;
    }
    let whole = seconds.trunc() as u32;
    let millis = ((seconds - seconds.trunc()) * 1000.0).round().min(999.0) as u32;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, whole, millis)?;
    Some(date.and_time(time).and_utc())
}
