use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::Instant;

use bme280::{Reading, SensorSource};
use station_err::Result;

use crate::link::LinkSupervisor;
use crate::server::RequestServer;
use crate::uploader::{UploadEvent, UploadResult, Uploader};

//----------------------------------------------------------------------------------------------------------------------------------
/// A recurring obligation's due-time. Once due it fires exactly once, and the
/// next due-time is re-anchored to now, so missed periods never pile up.
pub struct Periodic {
    period : Duration,
    next : Instant,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Periodic {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(period : Duration) -> Self {
        Self::anchored(period, Instant::now())
    }

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn anchored(period : Duration, start : Instant) -> Self {
        Self {
            period,
            next : start + period,
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn due(&mut self, now : Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next = now + self.period;
        true
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
/// The cooperative core. Three recurring obligations interleave on one
/// thread: link health checks, readings uploads and request servicing. Each
/// turn yields within the bounds its parts carry, so no obligation starves
/// another for longer than one serve cycle.
pub struct Scheduler {
    sensor : SensorSource,
    uploader : Uploader,
    supervisor : LinkSupervisor,
    server : RequestServer,
    listener : TcpListener,
    link_check : Periodic,
    readings_upload : Periodic,
    current : Option<Reading>,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Scheduler {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(sensor : SensorSource, uploader : Uploader, supervisor : LinkSupervisor,
               server : RequestServer, listener : TcpListener,
               link_check : Periodic, readings_upload : Periodic) -> Self {
        Self {
            sensor,
            uploader,
            supervisor,
            server,
            listener,
            link_check,
            readings_upload,
            current : None,
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn current(&self) -> Option<&Reading> {
        self.current.as_ref()
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// One cooperative turn: fire whatever is due, then serve at most one
    /// request within the accept bound.
    pub async fn turn(&mut self) -> Result<()> {
        let now = Instant::now();

        if self.link_check.due(now) {
            let state = self.supervisor.check().await;
            log::info!("Link check {:?}", state);
        }

        if self.readings_upload.due(now) {
            self.upload_readings().await;
        }

        self.server.serve_one(&self.listener, &mut self.sensor, &self.uploader, &mut self.current).await
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// Failures are reported and absorbed; the loop itself never dies.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if let Err(error) = self.turn().await {
                log::error!("Scheduler turn failed {}", error);
            }
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// A scheduled upload always works from a fresh sample. Before the first
    /// successful sample a cycle is skipped rather than sending stale or
    /// uninitialized values.
    async fn upload_readings(&mut self) {
        let reading = match self.sensor.sample() {
            Ok(reading) => reading,
            Err(error) => {
                log::warn!("Skipping readings upload {}", error);
                let event = UploadEvent::Lifecycle(format!("Error: {}", error));
                if let Err(error) = self.uploader.upload(&event).await {
                    log::error!("Failed to record sampling fault {}", error);
                }
                return;
            }
        };
        self.current = Some(reading);

        match self.uploader.upload(&UploadEvent::Readings(reading)).await {
            Ok(UploadResult::Sent) => log::info!("Readings uploaded"),
            Ok(UploadResult::Fallback) => log::warn!("Readings written to fallback log"),
            Err(error) => log::error!("Readings lost {}", error),
        }
    }
}
