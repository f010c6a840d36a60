use std::time::Duration;

use serde::Serialize;

use bme280::Reading;
use station_err::{Result, StationError};

use crate::logger::{LocalLogger, LogRecord};

/// Advisory notification sent after a successful readings upload
const READINGS_LOGGED : &str = "Sensor readings logged successfully.";

//----------------------------------------------------------------------------------------------------------------------------------
// Wire shapes fixed by the logging service
#[derive(Serialize)]
struct ReadingsBody {
    #[serde(rename = "Temperature")]
    temperature : f32,
    #[serde(rename = "Humidity")]
    humidity : f32,
    #[serde(rename = "Pressure")]
    pressure : f32,
}

#[derive(Serialize)]
struct EventBody {
    #[serde(rename = "Event")]
    event : String,
}


//----------------------------------------------------------------------------------------------------------------------------------
/// A transient value handed to one upload attempt; not retained afterwards
pub enum UploadEvent {
    Readings(Reading),
    Lifecycle(String),
}

//----------------------------------------------------------------------------------------------------------------------------------
#[derive(PartialEq, Debug)]
pub enum UploadResult {
    Sent,
    Fallback,
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Best-effort remote delivery. One POST per call, bounded by the configured
/// timeout, no retry; a failed attempt lands in the local fallback log.
pub struct Uploader {
    client : reqwest::Client,
    readings_url : String,
    event_url : String,
    timeout : Duration,
    logger : LocalLogger,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Uploader {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(readings_url : &str, event_url : &str, timeout : Duration, logger : LocalLogger) -> Self {
        Self {
            client : reqwest::Client::new(),
            readings_url : readings_url.to_string(),
            event_url : event_url.to_string(),
            timeout,
            logger,
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    async fn post(&self, url : &str, body : &impl Serialize) -> Result<()> {
        let response = self.client
            .post(url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StationError::transport(format!("{} from {}", response.status(), url)));
        }
        Ok(())
    }

    //------------------------------------------------------------------------------------------------------------------------------
    fn fallback_message(event : &UploadEvent) -> String {
        match event {
            UploadEvent::Lifecycle(message) => message.clone(),
            UploadEvent::Readings(reading) => format!("Unsent readings {}", reading),
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// A returned Storage error means the fallback write itself failed; the
    /// record is lost and the caller must surface that.
    pub async fn upload(&self, event : &UploadEvent) -> Result<UploadResult> {
        let attempt = match event {
            UploadEvent::Readings(reading) => {
                let body = ReadingsBody {
                    temperature : reading.temperature(),
                    humidity : reading.humidity(),
                    pressure : reading.pressure(),
                };
                self.post(&self.readings_url, &body).await
            }
            UploadEvent::Lifecycle(message) => {
                let body = EventBody { event : message.clone() };
                self.post(&self.event_url, &body).await
            }
        };

        match attempt {
            Ok(()) => {
                if let UploadEvent::Readings(..) = event {
                    self.notify_logged().await;
                }
                Ok(UploadResult::Sent)
            }
            Err(error) => {
                log::warn!("Upload failed {}", error);
                self.logger.append(&LogRecord::new(&Self::fallback_message(event))).await?;
                Ok(UploadResult::Fallback)
            }
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// Advisory only. A transport miss here is logged locally and swallowed,
    /// never propagated.
    async fn notify_logged(&self) {
        let body = EventBody { event : String::from(READINGS_LOGGED) };
        if self.post(&self.event_url, &body).await.is_err() {
            if let Err(error) = self.logger.append(&LogRecord::new(READINGS_LOGGED)).await {
                log::error!("Fallback log write failed {}", error);
            }
        }
    }
}
