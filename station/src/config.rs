use std::path::Path;
use toml::Table;

//----------------------------------------------------------------------------------------------------------------------------------
pub struct Config {
    config : Table
}


//----------------------------------------------------------------------------------------------------------------------------------
impl Config {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new() -> Self {
        let path = Path::new("station.toml");
        let config_str = match std::fs::read_to_string(path) {
            Ok(config_str) => config_str,
            Err(error) => panic!("Failed to read {:#?} {}", path, error)
        };
        Self::parse(&config_str)
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn parse(config_str : &str) -> Self {
        let config = match config_str.parse() {
            Ok(cfg) => cfg,
            Err(error) => panic!("Config file error\n{}", error)
        };

        Self { config }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_dev_name(&self) -> &str {
        match self.config["sensor"]["dev"].as_str() {
            Some(dev) => dev,
            None => panic!("No dev specified in config file sensor section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_probe_addr(&self) -> &str {
        match self.config["link"]["probe_addr"].as_str() {
            Some(addr) => addr,
            None => panic!("No probe_addr specified in config file link section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_led(&self) -> &str {
        match self.config["link"]["led"].as_str() {
            Some(led) => led,
            None => panic!("No led specified in config file link section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_check_period(&self) -> u64 {
        match self.config["link"]["check_period_in_mins"].as_integer() {
            Some(period) => period as u64,
            None => panic!("No check period specified in config file link section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_event_url(&self) -> &str {
        match self.config["upload"]["event_url"].as_str() {
            Some(url) => url,
            None => panic!("No event_url specified in config file upload section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_readings_url(&self) -> &str {
        match self.config["upload"]["readings_url"].as_str() {
            Some(url) => url,
            None => panic!("No readings_url specified in config file upload section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_upload_period(&self) -> u64 {
        match self.config["upload"]["period_in_mins"].as_integer() {
            Some(period) => period as u64,
            None => panic!("No upload period specified in config file upload section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_upload_timeout(&self) -> u64 {
        match self.config["upload"]["timeout_in_secs"].as_integer() {
            Some(timeout) => timeout as u64,
            None => panic!("No upload timeout specified in config file upload section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_port(&self) -> u16 {
        match self.config["server"]["port"].as_integer() {
            Some(port) => port as u16,
            None => panic!("No port specified in config file server section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_recv_timeout(&self) -> u64 {
        match self.config["server"]["recv_timeout_in_secs"].as_integer() {
            Some(timeout) => timeout as u64,
            None => panic!("No recv timeout specified in config file server section")
        }
    }


    //------------------------------------------------------------------------------------------------------------------------------
    pub fn get_log_file(&self) -> &str {
        match self.config["fallback"]["log_file"].as_str() {
            Some(log_file) => log_file,
            None => panic!("No log_file specified in config file fallback section")
        }
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG : &str = r#"
[sensor]
dev = "/dev/bme280"

[link]
probe_addr = "192.168.0.3:5000"
led = "/sys/class/leds/led0/brightness"
check_period_in_mins = 5

[upload]
event_url = "http://192.168.0.3:5000/log_event"
readings_url = "http://192.168.0.3:5000/log_readings"
period_in_mins = 15
timeout_in_secs = 10

[server]
port = 80
recv_timeout_in_secs = 30

[fallback]
log_file = "/var/log/station.txt"
"#;

    #[test]
    fn reads_every_section() {
        let config = Config::parse(CONFIG);

        assert_eq!(config.get_dev_name(), "/dev/bme280");
        assert_eq!(config.get_probe_addr(), "192.168.0.3:5000");
        assert_eq!(config.get_led(), "/sys/class/leds/led0/brightness");
        assert_eq!(config.get_check_period(), 5);
        assert_eq!(config.get_event_url(), "http://192.168.0.3:5000/log_event");
        assert_eq!(config.get_readings_url(), "http://192.168.0.3:5000/log_readings");
        assert_eq!(config.get_upload_period(), 15);
        assert_eq!(config.get_upload_timeout(), 10);
        assert_eq!(config.get_port(), 80);
        assert_eq!(config.get_recv_timeout(), 30);
        assert_eq!(config.get_log_file(), "/var/log/station.txt");
    }

    #[test]
    #[should_panic]
    fn missing_key_panics() {
        let config = Config::parse("[sensor]\n");
        config.get_dev_name();
    }
}
