use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use bme280::{Reading, SensorSource};
use station_err::Result;

use crate::uploader::{UploadEvent, Uploader};

const REQUEST_BUF_SIZE : usize = 1024;
const WEATHER_PATH : &str = "/weather";

//----------------------------------------------------------------------------------------------------------------------------------
#[derive(Serialize)]
struct WeatherBody {
    temperature : f32,
    humidity : f32,
    pressure : f32,
}


//----------------------------------------------------------------------------------------------------------------------------------
fn ok_response(body : &str) -> String {
    format!("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{}", body)
}

fn not_found_response() -> String {
    String::from("HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\n\r\n404 Not Found")
}

fn error_response() -> String {
    String::from("HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\n\r\nError reading data")
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Serves one connection at a time: one request, one response, then close.
/// Every wait is bounded so a slow client cannot hold the cooperative thread.
pub struct RequestServer {
    accept_timeout : Duration,
    recv_timeout : Duration,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl RequestServer {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(accept_timeout : Duration, recv_timeout : Duration) -> Self {
        Self {
            accept_timeout,
            recv_timeout,
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// Accepts at most one connection within the accept bound. A served
    /// weather request replaces the current reading with its fresh sample.
    pub async fn serve_one(&self, listener : &TcpListener, sensor : &mut SensorSource,
                           uploader : &Uploader, current : &mut Option<Reading>) -> Result<()> {
        let accepted = match timeout(self.accept_timeout, listener.accept()).await {
            Ok(accepted) => accepted,
            // nobody called; hand control back to the scheduler
            Err(..) => return Ok(()),
        };

        let mut stream = match accepted {
            Ok((stream, _)) => stream,
            Err(error) => {
                self.report(uploader, &format!("Error: accept failed {}", error)).await;
                return Ok(());
            }
        };

        let response = match self.read_request(&mut stream).await {
            Ok(request) => self.route(&request, sensor, uploader, current).await,
            Err(cause) => {
                self.report(uploader, &format!("Error: {}", cause)).await;
                error_response()
            }
        };

        if let Err(error) = stream.write_all(response.as_bytes()).await {
            log::warn!("Failed to write response {}", error);
        }
        // connection closes when the stream drops; no keep-alive
        Ok(())
    }

    //------------------------------------------------------------------------------------------------------------------------------
    async fn read_request(&self, stream : &mut TcpStream) -> std::result::Result<String, String> {
        let mut buf = [0u8; REQUEST_BUF_SIZE];
        match timeout(self.recv_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) => Ok(String::from_utf8_lossy(&buf[..n]).into_owned()),
            Ok(Err(error)) => Err(format!("request read failed {}", error)),
            Err(..) => Err(String::from("request receive timed out")),
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// Substring routing; malformed requests fall through to 404
    async fn route(&self, request : &str, sensor : &mut SensorSource,
                   uploader : &Uploader, current : &mut Option<Reading>) -> String {
        if !request.contains(WEATHER_PATH) {
            return not_found_response();
        }

        let reading = match sensor.sample() {
            Ok(reading) => reading,
            Err(error) => {
                self.report(uploader, &format!("Error: {}", error)).await;
                return error_response();
            }
        };

        let body = WeatherBody {
            temperature : reading.temperature(),
            humidity : reading.humidity(),
            pressure : reading.pressure(),
        };
        match serde_json::to_string(&body) {
            Ok(body) => {
                *current = Some(reading);
                ok_response(&body)
            }
            Err(error) => {
                self.report(uploader, &format!("Error: {}", error)).await;
                error_response()
            }
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    async fn report(&self, uploader : &Uploader, message : &str) {
        let event = UploadEvent::Lifecycle(String::from(message));
        if let Err(error) = uploader.upload(&event).await {
            log::error!("Failed to record server fault {}", error);
        }
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bme280::{Bme280, RawSample};
    use crate::logger::LocalLogger;
    use station_err::StationError;
    use tokio::runtime::Runtime;

    const TEST_ACCEPT : Duration = Duration::from_secs(2);
    const TEST_RECV : Duration = Duration::from_secs(2);

    struct FakeBus {
        fail : bool,
    }

    impl Bme280 for FakeBus {
        fn read_raw(&mut self) -> Result<RawSample> {
            if self.fail {
                return Err(StationError::sampling("bus transaction failed"));
            }
            Ok(RawSample {
                temperature : String::from("23.5C"),
                humidity : String::from("41%"),
                pressure : String::from("1013.2hPa"),
            })
        }
    }

    fn temp_log(name : &str) -> String {
        let path = std::env::temp_dir().join(format!("station_{}_{}.txt", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path.to_str().unwrap().to_string()
    }

    fn log_lines(log_file : &str) -> Vec<String> {
        match std::fs::read_to_string(log_file) {
            Ok(contents) => contents.lines().map(String::from).collect(),
            Err(..) => Vec::new()
        }
    }

    // an address nothing listens on, so lifecycle events land in the log file
    fn refused_addr() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("{}", addr)
    }

    fn offline_uploader(log_file : &str) -> Uploader {
        let addr = refused_addr();
        Uploader::new(
            &format!("http://{}/log_readings", addr),
            &format!("http://{}/log_event", addr),
            Duration::from_secs(1),
            LocalLogger::new(log_file))
    }

    // one client request against one serve_one turn, returning the raw response
    fn exchange(request : &'static str, fail_sample : bool, log_file : &str) -> (String, Option<Reading>) {
        let rt = Runtime::new().unwrap();
        let listener = rt.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = rt.spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            String::from_utf8_lossy(&response).into_owned()
        });

        let mut sensor = SensorSource::new(Box::new(FakeBus { fail : fail_sample }));
        let uploader = offline_uploader(log_file);
        let server = RequestServer::new(TEST_ACCEPT, TEST_RECV);
        let mut current = None;

        rt.block_on(server.serve_one(&listener, &mut sensor, &uploader, &mut current)).unwrap();
        (rt.block_on(client).unwrap(), current)
    }

    fn body_of(response : &str) -> &str {
        response.split("\r\n\r\n").nth(1).unwrap()
    }

    #[test]
    fn weather_request_returns_the_fresh_triple() {
        let log_file = temp_log("server_weather");
        let (response, current) = exchange("GET /weather HTTP/1.1\r\n\r\n", false, &log_file);

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Content-Type: application/json"));

        let body : serde_json::Value = serde_json::from_str(body_of(&response)).unwrap();
        assert_relative_eq!(body["temperature"].as_f64().unwrap(), 23.5, max_relative = 0.001);
        assert_relative_eq!(body["humidity"].as_f64().unwrap(), 41.0, max_relative = 0.001);
        assert_relative_eq!(body["pressure"].as_f64().unwrap(), 1013.2, max_relative = 0.001);

        // the served reading became the current one
        let current = current.unwrap();
        assert_relative_eq!(current.temperature(), 23.5, max_relative = 0.001);
        assert!(log_lines(&log_file).is_empty());
    }

    #[test]
    fn unknown_path_is_not_found() {
        let log_file = temp_log("server_unknown");
        let (response, current) = exchange("GET /other HTTP/1.1\r\n\r\n", false, &log_file);

        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
        assert_eq!(body_of(&response), "404 Not Found");
        assert!(current.is_none());
        assert!(log_lines(&log_file).is_empty());
    }

    #[test]
    fn malformed_request_is_treated_as_unknown() {
        let log_file = temp_log("server_malformed");
        let (response, _) = exchange("\x01\x02\x03garbage", false, &log_file);

        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[test]
    fn failed_sample_is_a_server_error_with_one_lifecycle_record() {
        let log_file = temp_log("server_sample_fail");
        let (response, current) = exchange("GET /weather HTTP/1.1\r\n\r\n", true, &log_file);

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error"));
        assert_eq!(body_of(&response), "Error reading data");
        assert!(current.is_none());

        let lines = log_lines(&log_file);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Error: Sampling Error"));
        let _ = std::fs::remove_file(&log_file);
    }

    #[test]
    fn idle_accept_window_returns_control() {
        let rt = Runtime::new().unwrap();
        let listener = rt.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();

        let mut sensor = SensorSource::new(Box::new(FakeBus { fail : false }));
        let log_file = temp_log("server_idle");
        let uploader = offline_uploader(&log_file);
        let server = RequestServer::new(Duration::from_millis(20), TEST_RECV);
        let mut current = None;

        let started = std::time::Instant::now();
        rt.block_on(server.serve_one(&listener, &mut sensor, &uploader, &mut current)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(current.is_none());
    }

    #[test]
    fn json_body_round_trips() {
        let body = WeatherBody {
            temperature : 23.5,
            humidity : 41.0,
            pressure : 1013.2,
        };
        let encoded = serde_json::to_string(&body).unwrap();
        let decoded : serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_relative_eq!(decoded["temperature"].as_f64().unwrap() as f32, body.temperature, max_relative = 0.0001);
        assert_relative_eq!(decoded["humidity"].as_f64().unwrap() as f32, body.humidity, max_relative = 0.0001);
        assert_relative_eq!(decoded["pressure"].as_f64().unwrap() as f32, body.pressure, max_relative = 0.0001);
    }
}
