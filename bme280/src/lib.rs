//!
//! BME280 sensor source: raw collaborator values parsed to numeric readings
//!

use std::fmt;
use std::str::SplitWhitespace;
use std::time::Instant;

use station_err::{Result, StationError};

// Unit tokens the collaborator may append to each value. Longer tokens first
// so "hPa" is not consumed as a bare "Pa" remainder.
const TEMPERATURE_UNITS : [&str; 2] = ["°C", "C"];
const HUMIDITY_UNITS : [&str; 1] = ["%"];
const PRESSURE_UNITS : [&str; 2] = ["hPa", "Pa"];


//----------------------------------------------------------------------------------------------------------------------------------
/// One unparsed triple as delivered by the sensor collaborator, each value a
/// formatted string that may carry a unit suffix, e.g. "23.5C" or "41%".
pub struct RawSample {
    pub temperature : String,
    pub humidity : String,
    pub pressure : String,
}


//----------------------------------------------------------------------------------------------------------------------------------
/// The sensor collaborator. One call is one bus transaction; implementations
/// report failures as Sampling errors.
pub trait Bme280 {
    fn read_raw(&mut self) -> Result<RawSample>;
}


//----------------------------------------------------------------------------------------------------------------------------------
/// A validated sample. Immutable; superseded by the next sample, never
/// mutated.
#[derive(Clone, Copy)]
pub struct Reading {
    temperature : f32,
    humidity : f32,
    pressure : f32,
    timestamp : Instant,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Reading {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(temperature : f32, humidity : f32, pressure : f32) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            timestamp : Instant::now(),
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}C {:.1}% {:.1}hPa", self.temperature, self.humidity, self.pressure)
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
fn strip_units<'a>(value : &'a str, units : &[&str]) -> &'a str {
    let value = value.trim();
    for unit in units {
        if let Some(body) = value.strip_suffix(unit) {
            return body.trim_end();
        }
    }
    value
}


//----------------------------------------------------------------------------------------------------------------------------------
fn parse_value(raw : &str, units : &[&str]) -> Result<f32> {
    Ok(strip_units(raw, units).parse::<f32>()?)
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Wraps the collaborator and produces validated numeric triples. No retry
/// here; retry policy belongs to the caller.
pub struct SensorSource {
    dev : Box<dyn Bme280>,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl SensorSource {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(dev : Box<dyn Bme280>) -> Self {
        Self { dev }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn sample(&mut self) -> Result<Reading> {
        let raw = self.dev.read_raw()?;
        let temperature = parse_value(&raw.temperature, &TEMPERATURE_UNITS)?;
        let humidity = parse_value(&raw.humidity, &HUMIDITY_UNITS)?;
        let pressure = parse_value(&raw.pressure, &PRESSURE_UNITS)?;
        Ok(Reading::new(temperature, humidity, pressure))
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
fn next_field(fields : &mut SplitWhitespace) -> Result<String> {
    match fields.next() {
        Some(field) => Ok(String::from(field)),
        None => Err(StationError::sampling("Truncated sample line"))
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Device-file backend: the driver exports one whitespace-separated line of
/// temperature, humidity and pressure, each field carrying its unit suffix.
pub struct DevBme280 {
    dev_name : String,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl DevBme280 {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(dev_name : &str) -> Self {
        Self {
            dev_name : dev_name.to_string(),
        }
    }
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Bme280 for DevBme280 {

    //------------------------------------------------------------------------------------------------------------------------------
    fn read_raw(&mut self) -> Result<RawSample> {
        let line = match std::fs::read_to_string(&self.dev_name) {
            Ok(line) => line,
            Err(error) => return Err(StationError::sampling(format!("{} {}", self.dev_name, error)))
        };
        let mut fields = line.split_whitespace();
        Ok(RawSample {
            temperature : next_field(&mut fields)?,
            humidity : next_field(&mut fields)?,
            pressure : next_field(&mut fields)?,
        })
    }
}
