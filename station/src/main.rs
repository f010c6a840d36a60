//!
//! Weather station device agent: samples a BME280, serves the latest reading
//! over HTTP and forwards readings and lifecycle events to a remote logging
//! service, falling back to a local log file when the network path is down.
//!

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::runtime::Builder;

use bme280::{DevBme280, SensorSource};
use station_err::Result;

use crate::config::Config;
use crate::link::{Led, LinkSupervisor, TcpProbe, PULSE_HALF_PERIOD};
use crate::logger::LocalLogger;
use crate::scheduler::{Periodic, Scheduler};
use crate::server::RequestServer;
use crate::uploader::Uploader;

mod config;
mod link;
mod logger;
mod scheduler;
mod server;
mod uploader;

const PROBE_TIMEOUT : Duration = Duration::from_secs(2);
const ACCEPT_TIMEOUT : Duration = Duration::from_secs(1);

//----------------------------------------------------------------------------------------------------------------------------------
fn main() -> Result<()> {
    env_logger::init();

    let config = Config::new();

    let sensor = SensorSource::new(Box::new(DevBme280::new(config.get_dev_name())));
    log::info!("Reading from {} for weather sensor", config.get_dev_name());

    let logger = LocalLogger::new(config.get_log_file());
    let uploader = Uploader::new(
        config.get_readings_url(),
        config.get_event_url(),
        Duration::from_secs(config.get_upload_timeout()),
        logger);

    let port = Box::new(TcpProbe::new(config.get_probe_addr(), PROBE_TIMEOUT));
    let indicator = Box::new(Led::new(config.get_led()));
    let mut supervisor = LinkSupervisor::new(port, indicator, PULSE_HALF_PERIOD);

    // single-threaded runtime: obligations interleave, they never run in
    // parallel, so the shared reading needs no lock
    let rt = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(error) => panic!("Failed to build runtime {}", error)
    };

    rt.block_on(supervisor.initiate())?;
    log::info!("Link is up");

    let sock_addr = format!("0.0.0.0:{}", config.get_port());
    let listener = match rt.block_on(TcpListener::bind(&sock_addr)) {
        Ok(listener) => listener,
        Err(error) => panic!("Failed to bind {} - {}", sock_addr, error)
    };
    log::info!("Listening on: {}", sock_addr);

    let server = RequestServer::new(ACCEPT_TIMEOUT, Duration::from_secs(config.get_recv_timeout()));

    let mut scheduler = Scheduler::new(
        sensor, uploader, supervisor, server, listener,
        Periodic::new(Duration::from_secs(config.get_check_period() * 60)),
        Periodic::new(Duration::from_secs(config.get_upload_period() * 60)));

    rt.block_on(scheduler.run())
}
