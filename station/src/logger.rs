use std::fmt;

use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use station_err::Result;

//----------------------------------------------------------------------------------------------------------------------------------
/// One fallback record. Write-once; the agent never reads records back.
pub struct LogRecord {
    timestamp : i64,
    message : String,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl LogRecord {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(message : &str) -> Self {
        Self {
            timestamp : Utc::now().timestamp(),
            message : message.to_string(),
        }
    }
}

//----------------------------------------------------------------------------------------------------------------------------------
impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.timestamp, self.message)
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Appends records to the persistent fallback log. A failure here is the
/// terminal telemetry failure mode; there is no further fallback.
pub struct LocalLogger {
    log_file : String,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl LocalLogger {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(log_file : &str) -> Self {
        Self {
            log_file : log_file.to_string(),
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// The file handle is scoped to this call and released whether or not
    /// the write succeeds.
    pub async fn append(&self, record : &LogRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .await?;
        file.write_all(format!("{}\n", record).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
