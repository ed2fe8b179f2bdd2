//! Network interface address lookup.

use std::net::IpAddr;

use crate::config::schema::{BindMode, InterfacesConfig};

/// Reports the IP address the server uses for a bind mode.
pub trait AddressQuery: Send + Sync {
    fn ip_for(&self, mode: BindMode) -> IpAddr;
}

/// Addresses taken from the `[interfaces]` configuration section.
#[derive(Debug, Clone)]
pub struct ConfiguredInterfaces {
    station: IpAddr,
    soft_ap: IpAddr,
}

impl From<&InterfacesConfig> for ConfiguredInterfaces {
    fn from(config: &InterfacesConfig) -> Self {
        Self {
            station: config.station,
            soft_ap: config.softap,
        }
    }
}

impl AddressQuery for ConfiguredInterfaces {
    fn ip_for(&self, mode: BindMode) -> IpAddr {
        match mode {
            BindMode::Station => self.station,
            BindMode::SoftAp => self.soft_ap,
        }
    }
}
