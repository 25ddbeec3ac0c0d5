//! # Network
//! WiFi association, the credential captive portal and link quality.
use core::net::Ipv4Addr;

use heapless::String;

use crate::portal::percent_decode;
use crate::storage::{Field, KeyValueStore, Namespace, bounded};

/// Longest SSID.
pub const SSID_LEN: usize = 32;
/// Longest WPA2 passphrase.
pub const PASSWORD_LEN: usize = 64;

/// Credentials of one network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiCredentials {
    /// Network name.
    pub ssid: String<SSID_LEN>,
    /// Passphrase, empty for an open network.
    pub password: String<PASSWORD_LEN>,
}

impl WifiCredentials {
    /// Builds credentials, cutting both values to their bounds.
    #[must_use]
    pub fn new(ssid: &str, password: &str) -> Self {
        Self {
            ssid: bounded(ssid),
            password: bounded(password),
        }
    }

    /// Reads the `ssid` and `password` fields of a submitted credential form. `None` without an
    /// SSID.
    #[must_use]
    pub fn from_urlencoded(body: &str) -> Option<Self> {
        let mut credentials = Self::default();
        for (name, value) in body.split('&').filter_map(|pair| pair.split_once('=')) {
            match name {
                "ssid" => credentials.ssid = percent_decode(value),
                "password" => credentials.password = percent_decode(value),
                _ => {}
            }
        }
        (!credentials.ssid.is_empty()).then_some(credentials)
    }

    /// The credentials last entered in the captive portal, if any were saved.
    pub async fn load<S: KeyValueStore>(store: &mut S) -> Option<Self> {
        let ssid: String<SSID_LEN> = store.string_or_empty(Namespace::Settings, Field::WifiSsid).await;
        if ssid.is_empty() {
            return None;
        }
        let password = store.string_or_empty(Namespace::Settings, Field::WifiPassword).await;
        Some(Self { ssid, password })
    }

    /// Remembers the credentials for the next boot.
    pub async fn save<S: KeyValueStore>(&self, store: &mut S) {
        store.store_string(Namespace::Settings, Field::WifiSsid, &self.ssid).await;
        store
            .store_string(Namespace::Settings, Field::WifiPassword, &self.password)
            .await;
    }
}

/// The WiFi link.
pub trait Network {
    /// Joins the network and waits for an address. Returns whether the link is up.
    async fn try_connect(&mut self, credentials: &WifiCredentials) -> bool;

    /// Opens an access point named `name` serving a credential form, and waits until
    /// credentials were entered and joined successfully or `timeout_ms` passed. `None` waits
    /// without a deadline.
    async fn start_captive_portal(&mut self, name: &str, timeout_ms: Option<u32>) -> Option<WifiCredentials>;

    /// Received signal strength of the joined network in dBm.
    fn signal_strength(&mut self) -> i32;

    /// Address of the station interface.
    fn local_ip(&self) -> Option<Ipv4Addr>;

    /// Leaves the network and powers the radio down.
    async fn disable_radio(&mut self);
}
