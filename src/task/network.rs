//! # WiFi
//! Brings up the CYW43 and the network stack, joins networks, runs the captive portal that
//! collects new credentials and keeps the signal strength fresh.
//!
//! # populate constants SSID and PASSWORD
//! make sure to have a `wifi_config.json` file in the config folder formatted as follows:
//!```json
//!  {
//!     "ssid": "some_ssid_here",
//!     "password": "some_password_here"
//! }
//! ```
//! build.rs turns it into `wifi_secrets.rs`. These are the credentials tried when none are
//! stored.

include!(concat!(env!("OUT_DIR"), "/wifi_secrets.rs"));

use core::fmt::Write as _;
use core::net::Ipv4Addr;

use cyw43::{JoinOptions, ScanOptions};
use cyw43_pio::{DEFAULT_CLOCK_DIVIDER, PioSpi};
use defmt::{Debug2Format, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::{Config, ConfigV4, DhcpConfig, Ipv4Cidr, Stack, StackResources, StaticConfigV4};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_rp::pio::Pio;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::{Duration, Instant, Timer, with_timeout};
use embedded_io_async::Write;
use heapless::String;
use portable_atomic::{AtomicI32, Ordering};
use radio_core::network::SSID_LEN;
use radio_core::portal::html::write_credentials_page;
use radio_core::portal::http::{NOT_FOUND, Route};
use radio_core::{Network, WifiCredentials};
use rand::RngCore;
use static_cell::StaticCell;

use crate::task::portal::{HTTP_PORT, REQUEST_BUFFER_LEN, ServeError, read_request_head, render, send_page};
use crate::task::resources::{Irqs, WifiResources};

/// Host name announced over DHCP.
const HOSTNAME: &str = "streamradio";

/// How long a join may take.
const JOIN_TIMEOUT: Duration = Duration::from_secs(20);

/// How long DHCP may take after a join.
const DHCP_TIMEOUT: Duration = Duration::from_secs(15);

/// Address of the radio on its own access point.
const AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Channel of the access point.
const AP_CHANNEL: u8 = 6;

/// Interval between signal strength scans while joined.
const RSSI_REFRESH: Duration = Duration::from_secs(300);

/// Placeholder strength before the first scan.
const RSSI_UNKNOWN: i32 = -100;

/// The chip control, shared between the control loop and the signal scanner
static CONTROL: Mutex<CriticalSectionRawMutex, Option<cyw43::Control<'static>>> = Mutex::new(None);

/// The network joined last, `None` while not joined
static JOINED_SSID: Mutex<CriticalSectionRawMutex, Option<String<SSID_LEN>>> = Mutex::new(None);

/// Last measured signal strength in dBm
static RSSI: AtomicI32 = AtomicI32::new(RSSI_UNKNOWN);

/// The compiled-in credentials.
pub fn compiled_credentials() -> WifiCredentials {
    WifiCredentials::new(SSID, PASSWORD)
}

/// Runs the CYW43 driver.
#[embassy_executor::task]
async fn wifi_task(runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>) -> ! {
    runner.run().await
}

/// Runs the network stack.
#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Refreshes the cached signal strength while joined.
#[embassy_executor::task]
async fn signal_task(stack: Stack<'static>) -> ! {
    loop {
        if stack.is_config_up() {
            refresh_rssi().await;
        }
        Timer::after(RSSI_REFRESH).await;
    }
}

/// Scans for the joined network and stores its strength.
async fn refresh_rssi() {
    let Some(ssid) = JOINED_SSID.lock().await.clone() else {
        return;
    };
    let mut guard = CONTROL.lock().await;
    let Some(control) = guard.as_mut() else {
        return;
    };
    let mut options = ScanOptions::default();
    options.ssid = ssid.as_str().try_into().ok();
    let mut scanner = control.scan(options).await;
    if let Some(bss) = scanner.next().await {
        let rssi = i32::from(bss.rssi);
        RSSI.store(rssi, Ordering::Relaxed);
        info!("Signal strength {} dBm", rssi);
    }
}

/// DHCP configuration with our host name.
fn dhcp_config() -> DhcpConfig {
    let mut config = DhcpConfig::default();
    config.hostname = HOSTNAME.try_into().ok();
    config
}

/// Fixed address for running the access point.
fn access_point_config() -> ConfigV4 {
    ConfigV4::Static(StaticConfigV4 {
        address: Ipv4Cidr::new(AP_ADDRESS, 24),
        gateway: None,
        dns_servers: Default::default(),
    })
}

/// Powers up the WiFi chip, starts the network stack and the signal scanner.
pub async fn start(spawner: Spawner, r: WifiResources) -> Stack<'static> {
    info!("init wifi");
    let pwr = Output::new(r.pwr_pin, Level::Low);
    let cs = Output::new(r.cs_pin, Level::High);
    let mut pio = Pio::new(r.pio_sm, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        r.dio_pin,
        r.clk_pin,
        r.dma_ch,
    );

    // firmware blobs are flashed separately to these addresses
    let fw = unsafe { core::slice::from_raw_parts(0x1010_0000 as *const u8, 230_321) };
    let clm = unsafe { core::slice::from_raw_parts(0x1014_0000 as *const u8, 4752) };

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    unwrap!(spawner.spawn(wifi_task(runner)));

    info!("init control");
    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    // random seed
    let mut rng = RoscRng;
    let seed = rng.next_u64();

    static RESOURCES: StaticCell<StackResources<6>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        net_device,
        Config::dhcpv4(dhcp_config()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    unwrap!(spawner.spawn(net_task(runner)));

    *CONTROL.lock().await = Some(control);
    unwrap!(spawner.spawn(signal_task(stack)));
    stack
}

/// Serves the credential page until a client posts credentials.
async fn collect_credentials(stack: Stack<'static>, portal_name: &str) -> WifiCredentials {
    let mut rx_buffer = [0; 1024];
    let mut tx_buffer = [0; 1024];
    let mut request = [0; REQUEST_BUFFER_LEN];
    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(5)));
        if let Err(e) = socket.accept(HTTP_PORT).await {
            warn!("Captive portal accept failed: {:?}", e);
            continue;
        }
        let result = serve_credentials(&mut socket, &mut request, portal_name).await;
        socket.close();
        let _ = socket.flush().await;
        match result {
            Ok(Some(credentials)) => return credentials,
            Ok(None) => {}
            Err(e) => warn!("Captive portal request failed: {:?}", e),
        }
    }
}

/// Serves one captive portal request. Every GET gets the credential page, so phones that probe
/// for a login page land on it.
async fn serve_credentials(
    socket: &mut TcpSocket<'_>,
    buf: &mut [u8],
    portal_name: &str,
) -> Result<Option<WifiCredentials>, ServeError> {
    let (head, mut filled) = read_request_head(socket, buf).await?;
    match head.route {
        Route::Credentials => {
            let end = head.len + head.content_length;
            if end > buf.len() {
                socket.write_all(NOT_FOUND).await?;
                return Ok(None);
            }
            while filled < end {
                let n = socket.read(&mut buf[filled..end]).await?;
                if n == 0 {
                    return Err(ServeError::Closed);
                }
                filled += n;
            }
            let body = core::str::from_utf8(&buf[head.len..end]).unwrap_or_default();
            let credentials = WifiCredentials::from_urlencoded(body);
            let page = render::<128>(|page| {
                page.write_str("<!DOCTYPE html><html><body><h2>")?;
                page.write_str(if credentials.is_some() { "Connecting" } else { "SSID missing" })?;
                page.write_str("</h2></body></html>")
            })?;
            send_page(socket, &page).await?;
            Ok(credentials)
        }
        _ => {
            let page = render::<1024>(|page| write_credentials_page(page, portal_name))?;
            send_page(socket, &page).await?;
            Ok(None)
        }
    }
}

/// The control loop's view of the WiFi link.
pub struct WifiLink {
    /// The network stack
    stack: Stack<'static>,
}

impl WifiLink {
    /// A link over a started stack.
    pub const fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }

    /// Leaves the current network or closes the access point.
    async fn leave(&self) {
        *JOINED_SSID.lock().await = None;
        if let Some(control) = CONTROL.lock().await.as_mut() {
            control.leave().await;
        }
    }
}

impl Network for WifiLink {
    async fn try_connect(&mut self, credentials: &WifiCredentials) -> bool {
        info!("Joining network {}", credentials.ssid.as_str());
        self.stack.set_config_v4(ConfigV4::Dhcp(dhcp_config()));
        {
            let mut guard = CONTROL.lock().await;
            let Some(control) = guard.as_mut() else {
                return false;
            };
            let options = if credentials.password.is_empty() {
                JoinOptions::new_open()
            } else {
                JoinOptions::new(credentials.password.as_bytes())
            };
            match with_timeout(JOIN_TIMEOUT, control.join(&credentials.ssid, options)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Join failed with status {}", e.status);
                    return false;
                }
                Err(_) => {
                    warn!("Join timed out");
                    return false;
                }
            }
        }

        if with_timeout(DHCP_TIMEOUT, self.stack.wait_config_up()).await.is_err() {
            warn!("No DHCP lease");
            self.leave().await;
            return false;
        }
        if let Some(config) = self.stack.config_v4() {
            info!("Joined, address {}", config.address);
        }
        *JOINED_SSID.lock().await = Some(credentials.ssid.clone());
        refresh_rssi().await;
        true
    }

    async fn start_captive_portal(&mut self, name: &str, timeout_ms: Option<u32>) -> Option<WifiCredentials> {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(u64::from(ms)));
        loop {
            self.leave().await;
            self.stack.set_config_v4(access_point_config());
            if let Some(control) = CONTROL.lock().await.as_mut() {
                control.start_ap_open(name, AP_CHANNEL).await;
            }
            info!("Captive portal {} open at {:?}", name, Debug2Format(&AP_ADDRESS));

            let submitted = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        None
                    } else {
                        with_timeout(deadline - now, collect_credentials(self.stack, name))
                            .await
                            .ok()
                    }
                }
                None => Some(collect_credentials(self.stack, name).await),
            };
            let Some(credentials) = submitted else {
                warn!("Captive portal timed out");
                self.leave().await;
                return None;
            };

            // give the phone time to receive the answer before the access point goes away
            Timer::after_secs(1).await;
            self.leave().await;
            if self.try_connect(&credentials).await {
                return Some(credentials);
            }
            warn!("Submitted credentials did not connect, reopening the portal");
        }
    }

    fn signal_strength(&mut self) -> i32 {
        RSSI.load(Ordering::Relaxed)
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.stack.config_v4().map(|config| config.address.address())
    }

    async fn disable_radio(&mut self) {
        info!("WiFi off");
        self.leave().await;
        if let Some(control) = CONTROL.lock().await.as_mut() {
            control.set_power_management(cyw43::PowerManagementMode::SuperSave).await;
        }
    }
}
