//! Daemon configuration file rendering.

use crate::discovery::ServiceDirName;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

pub const TORRC_FILE: &str = "torrc";

/// Renders the configuration for one daemon instance.
///
/// `service_ports` maps advertised port to the loopback port traffic is
/// forwarded to. Services render in ascending advertised-port order.
pub fn render(data_directory: &Path, socks_port: u16, service_ports: &BTreeMap<u16, u16>) -> String {
    let dir = data_directory.display();
    let mut torrc = String::new();
    let _ = writeln!(torrc, "SocksPort {}", socks_port);
    let _ = writeln!(torrc, "DataDirectory {}", dir);
    for (&advertised, &local) in service_ports {
        let service = ServiceDirName::new(advertised, local);
        let _ = writeln!(torrc, "HiddenServiceDir {}/{}", dir, service);
        let _ = writeln!(torrc, "HiddenServicePort {} 127.0.0.1:{}", advertised, local);
        torrc.push('\n');
    }
    torrc
}
