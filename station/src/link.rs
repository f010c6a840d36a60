use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tokio::time::sleep;

use station_err::Result;

/// Indicator blink rate while association is unresolved
pub const PULSE_HALF_PERIOD : Duration = Duration::from_millis(500);

//----------------------------------------------------------------------------------------------------------------------------------
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Link-layer association collaborator. Association itself is external; the
/// supervisor only initiates and observes it.
pub trait LinkPort {
    fn associate(&mut self) -> Result<()>;
    fn is_associated(&mut self) -> bool;
}

//----------------------------------------------------------------------------------------------------------------------------------
/// Binary link-state indicator collaborator
pub trait Indicator {
    fn set(&mut self, on : bool);
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Owns the link state. Nothing else mutates it.
pub struct LinkSupervisor {
    port : Box<dyn LinkPort>,
    indicator : Box<dyn Indicator>,
    state : LinkState,
    pulse : Duration,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl LinkSupervisor {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(port : Box<dyn LinkPort>, indicator : Box<dyn Indicator>, pulse : Duration) -> Self {
        Self {
            port,
            indicator,
            state : LinkState::Disconnected,
            pulse,
        }
    }

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn state(&self) -> LinkState {
        self.state
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// Initial association. Blocks the caller, pulsing the indicator each
    /// poll until the link is up, then holds it steady on.
    pub async fn initiate(&mut self) -> Result<()> {
        self.state = LinkState::Connecting;
        self.port.associate()?;

        while !self.port.is_associated() {
            self.indicator.set(true);
            sleep(self.pulse).await;
            self.indicator.set(false);
            sleep(self.pulse).await;
        }

        self.indicator.set(true);
        self.state = LinkState::Connected;
        Ok(())
    }

    //------------------------------------------------------------------------------------------------------------------------------
    /// Periodic health re-check. One status poll; a down link gets a single
    /// indicator pulse and control returns to the scheduler. Reconnection is
    /// left to a later check or an explicit re-initiate.
    pub async fn check(&mut self) -> LinkState {
        if self.port.is_associated() {
            self.indicator.set(true);
            self.state = LinkState::Connected;
        } else {
            self.indicator.set(true);
            sleep(self.pulse).await;
            self.indicator.set(false);
            self.state = LinkState::Disconnected;
        }
        self.state
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Production port: the link is judged associated when the logging host
/// accepts a TCP connection within the probe timeout.
pub struct TcpProbe {
    addr : String,
    timeout : Duration,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl TcpProbe {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(addr : &str, timeout : Duration) -> Self {
        Self {
            addr : addr.to_string(),
            timeout,
        }
    }
}

//----------------------------------------------------------------------------------------------------------------------------------
impl LinkPort for TcpProbe {

    //------------------------------------------------------------------------------------------------------------------------------
    fn associate(&mut self) -> Result<()> {
        // association is handled by the host network stack
        Ok(())
    }

    //------------------------------------------------------------------------------------------------------------------------------
    fn is_associated(&mut self) -> bool {
        let mut addrs = match self.addr.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(error) => {
                log::warn!("Cannot resolve {} {}", self.addr, error);
                return false;
            }
        };
        match addrs.next() {
            Some(addr) => TcpStream::connect_timeout(&addr, self.timeout).is_ok(),
            None => false
        }
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
/// Production indicator: a sysfs LED brightness file
pub struct Led {
    path : String,
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Led {

    //------------------------------------------------------------------------------------------------------------------------------
    pub fn new(path : &str) -> Self {
        Self {
            path : path.to_string(),
        }
    }
}

//----------------------------------------------------------------------------------------------------------------------------------
impl Indicator for Led {

    //------------------------------------------------------------------------------------------------------------------------------
    fn set(&mut self, on : bool) {
        let value = if on { "1" } else { "0" };
        if let Err(error) = std::fs::write(&self.path, value) {
            log::warn!("Failed to drive indicator {} {}", self.path, error);
        }
    }
}


//----------------------------------------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::runtime::Runtime;

    const TEST_PULSE : Duration = Duration::from_millis(1);

    struct FakePort {
        // responses to successive is_associated polls; last one repeats
        polls : Vec<bool>,
        cursor : usize,
    }

    impl FakePort {
        fn new(polls : Vec<bool>) -> Self {
            Self { polls, cursor : 0 }
        }
    }

    impl LinkPort for FakePort {
        fn associate(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_associated(&mut self) -> bool {
            let up = self.polls[self.cursor];
            if self.cursor + 1 < self.polls.len() {
                self.cursor += 1;
            }
            up
        }
    }

    struct FakeIndicator {
        trace : Rc<RefCell<Vec<bool>>>,
    }

    impl Indicator for FakeIndicator {
        fn set(&mut self, on : bool) {
            self.trace.borrow_mut().push(on);
        }
    }

    fn supervisor(polls : Vec<bool>) -> (LinkSupervisor, Rc<RefCell<Vec<bool>>>) {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let indicator = FakeIndicator { trace : trace.clone() };
        let supervisor = LinkSupervisor::new(Box::new(FakePort::new(polls)), Box::new(indicator), TEST_PULSE);
        (supervisor, trace)
    }

    #[test]
    fn initiate_pulses_until_associated() {
        let (mut supervisor, trace) = supervisor(vec![false, false, true]);

        let rt = Runtime::new().unwrap();
        rt.block_on(supervisor.initiate()).unwrap();

        assert_eq!(supervisor.state(), LinkState::Connected);
        // two unresolved polls, then held steady on
        assert_eq!(*trace.borrow(), vec![true, false, true, false, true]);
    }

    #[test]
    fn check_on_a_down_link_pulses_once_and_returns() {
        let (mut supervisor, trace) = supervisor(vec![false]);

        let rt = Runtime::new().unwrap();
        let state = rt.block_on(supervisor.check());

        assert_eq!(state, LinkState::Disconnected);
        assert_eq!(supervisor.state(), LinkState::Disconnected);
        assert_eq!(*trace.borrow(), vec![true, false]);
    }

    #[test]
    fn check_on_a_healthy_link_holds_the_indicator_on() {
        let (mut supervisor, trace) = supervisor(vec![true]);

        let rt = Runtime::new().unwrap();
        let state = rt.block_on(supervisor.check());

        assert_eq!(state, LinkState::Connected);
        assert_eq!(*trace.borrow(), vec![true]);
    }

    #[test]
    fn down_then_up_recovers_on_a_later_check() {
        let (mut supervisor, _trace) = supervisor(vec![false, true]);

        let rt = Runtime::new().unwrap();
        assert_eq!(rt.block_on(supervisor.check()), LinkState::Disconnected);
        assert_eq!(rt.block_on(supervisor.check()), LinkState::Connected);
    }
}
