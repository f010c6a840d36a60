use std::fmt;
use std::num::ParseFloatError;
use tokio::io;

//----------------------------------------------------------------------------------------------------------------------------------
/// Failure taxonomy shared by the station crates. Each component converts
/// foreign failures into the variant naming its own failure domain.
pub enum StationError {
    /// Sensor bus or value-parse failure, recoverable on the next cycle
    Sampling(String),
    /// Remote call failure, the caller routes the record to fallback storage
    Transport(String),
    /// Fallback write failure, terminal for that record
    Storage(String),
    /// Malformed or unservable request
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, StationError>;


//----------------------------------------------------------------------------------------------------------------------------------
impl StationError {
    pub fn sampling(cause : impl fmt::Display) -> Self {
        Self::Sampling(format!("{}", cause))
    }

    pub fn transport(cause : impl fmt::Display) -> Self {
        Self::Transport(format!("{}", cause))
    }

    pub fn storage(cause : impl fmt::Display) -> Self {
        Self::Storage(format!("{}", cause))
    }

    pub fn protocol(cause : impl fmt::Display) -> Self {
        Self::Protocol(format!("{}", cause))
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sampling(cause) => write!(f, "Sampling Error {}", cause),
            Self::Transport(cause) => write!(f, "Transport Error {}", cause),
            Self::Storage(cause) => write!(f, "Storage Error {}", cause),
            Self::Protocol(cause) => write!(f, "Protocol Error {}", cause),
        }
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl fmt::Debug for StationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl From<ParseFloatError> for StationError {
    fn from(error: ParseFloatError) -> Self {
        Self::Sampling(format!("Parse to Float Error {}", error))
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl From<reqwest::Error> for StationError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(format!("HTTP Error {}", error))
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl From<io::Error> for StationError {
    fn from(error: io::Error) -> Self {
        Self::Storage(format!("IO Error {}", error))
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
impl From<serde_json::Error> for StationError {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(format!("JSON Error {}", error))
    }
}
