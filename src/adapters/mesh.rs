//! Telemetry uplink over UDP.
//!
//! Frames travel as single datagrams to the habitat collector. On the
//! full node the socket rides the mesh interface ESP-IDF exposes as a
//! normal netif, so plain `std::net` works on target and host alike; the
//! battery node opens the socket fresh on every wake.

use std::net::{SocketAddr, UdpSocket};

use log::{info, warn};

use crate::app::ports::NetworkPort;
use crate::error::CommsError;

/// Default collector endpoint; overridden at construction when the
/// commissioning dataset carries a different one.
pub const DEFAULT_COLLECTOR: &str = "192.168.4.1:5683";

pub struct MeshUplink {
    socket: Option<UdpSocket>,
    collector: SocketAddr,
}

impl MeshUplink {
    pub fn new(collector: SocketAddr) -> Self {
        let mut uplink = Self {
            socket: None,
            collector,
        };
        uplink.try_bind();
        uplink
    }

    fn try_bind(&mut self) {
        match UdpSocket::bind("0.0.0.0:0") {
            Ok(socket) => {
                info!("uplink bound, collector {}", self.collector);
                self.socket = Some(socket);
            }
            Err(e) => warn!("uplink bind failed: {e}"),
        }
    }
}

impl NetworkPort for MeshUplink {
    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), CommsError> {
        // A failed bind at construction is retried lazily; the interface
        // may simply not have been up yet.
        if self.socket.is_none() {
            self.try_bind();
        }
        let socket = self.socket.as_ref().ok_or(CommsError::NotConnected)?;
        match socket.send_to(frame, self.collector) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("uplink send failed: {e}");
                Err(CommsError::SendFailed)
            }
        }
    }
}
