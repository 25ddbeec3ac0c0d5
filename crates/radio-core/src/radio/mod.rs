//! # Radio
//! The interaction state machine.
//!
//! [`Radio`] owns every collaborator and the whole session state. The firmware calls
//! [`Radio::boot`] once and then [`Radio::tick`] in a loop. A tick never waits on anything but
//! the collaborators' own short operations, except on the power-down path, which suspends until
//! the wake edge and then asks for a restart.
//!
//! The session keeps the menu and the timer setup in one [`Interaction`] value, so the two can
//! never be active at the same time.
mod runtime;
mod view;

#[cfg(test)]
mod tests;

use heapless::String;

use crate::audio::{AudioPipeline, METADATA_LEN, gain_for_volume};
use crate::clock::Clock;
use crate::display::{TextDisplay, screens};
use crate::input::{InputDevice, POSITION_MAX};
use crate::network::{Network, WifiCredentials};
use crate::portal::{PortalMode, StationForm, WebPortal};
use crate::power::PowerControl;
use crate::station::{StationStore, wrap_index};
use crate::storage::{Field, KeyValueStore, Namespace};
use crate::timer::{TimerDuration, TimerSetting};

/// How long a screen stays up after the last event.
pub const DISPLAY_TIMEOUT_MS: u32 = 3_500;

/// After a timer setup commit that left the timer on, a click within this window powers down.
pub const QUICK_HALT_WINDOW_MS: u32 = 3_000;

/// How long the fallback captive portal waits for credentials.
pub const CAPTIVE_PORTAL_TIMEOUT_MS: u32 = 120_000;

/// Volume on the first boot, and when timer setup unmutes without a stored level.
pub const DEFAULT_VOLUME: u8 = 50;

/// The collaborator types of one platform.
pub trait Platform {
    /// Persisted settings.
    type Store: KeyValueStore;
    /// Encoder, button and mode signals.
    type Input: InputDevice;
    /// Character display.
    type Display: TextDisplay;
    /// Stream player.
    type Audio: AudioPipeline;
    /// WiFi link.
    type Net: Network;
    /// Configuration web server.
    type Portal: WebPortal;
    /// Suspend and restart.
    type Power: PowerControl;
    /// Millisecond time.
    type Clock: Clock;
}

/// The collaborators handed to [`Radio::new`].
pub struct Devices<P: Platform> {
    /// Persisted settings.
    pub store: P::Store,
    /// Encoder, button and mode signals.
    pub input: P::Input,
    /// Character display.
    pub display: P::Display,
    /// Stream player.
    pub audio: P::Audio,
    /// WiFi link.
    pub net: P::Net,
    /// Configuration web server.
    pub portal: P::Portal,
    /// Suspend and restart.
    pub power: P::Power,
    /// Millisecond time.
    pub clock: P::Clock,
}

/// Fixed identity of the device.
#[derive(Debug, Clone)]
pub struct BootConfig {
    /// Name on the boot banner.
    pub name: &'static str,
    /// Version on the power-down screen.
    pub version: &'static str,
    /// SSID of the credential captive portal.
    pub portal_name: &'static str,
    /// Used when no credentials were saved from the captive portal.
    pub default_credentials: WifiCredentials,
}

/// Mode pins sampled at boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootOptions {
    /// Erase all persisted data first.
    pub factory_reset: bool,
    /// Replace the stations with the built-in table.
    pub reload_defaults: bool,
    /// Open the credential captive portal instead of joining.
    pub force_wifi_portal: bool,
    /// Start playing instead of waiting asleep.
    pub play_immediately: bool,
}

/// A boot that cannot continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// No WiFi connection, neither joined nor configured through the captive portal.
    WifiUnavailable,
}

/// What the caller does after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Keep ticking.
    Continue,
    /// The device powered down and woke again. State is gone, restart.
    Restart,
}

/// Whether the audio pipeline holds a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    /// No stream. The next awake tick starts one.
    Idle,
    /// A stream is open and pumped every tick.
    Streaming,
}

/// What the knob and button currently mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    /// Knob sets the volume, click opens the menu.
    Normal,
    /// Browsing stations.
    Menu {
        /// Highlighted station.
        cursor: usize,
        /// Encoder position to restore when the menu closes.
        saved_position: i32,
        /// Station a click switches back to, while the menu was opened and not yet scrolled.
        toggle: Option<usize>,
    },
    /// Choosing the sleep timer.
    TimerSetup {
        /// The choice so far, committed by a click.
        pending: TimerSetting,
    },
}

/// Timer sleep, orthogonal to the sleep timer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sleep {
    /// Running normally.
    Awake,
    /// Stream stopped, waiting for a click or a turn.
    Asleep,
}

/// Display timeout bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    /// A screen is up since the given time.
    On {
        /// Time of the last event.
        since: u32,
    },
    /// Blank, or showing an override message that does not time out.
    Off,
}

/// Working memory of the control loop.
struct Session {
    /// Station playing or about to play.
    current: usize,
    /// Live volume level 0..=100. Zero means power-down pending.
    volume: u8,
    /// Last volume written to the store.
    persisted_volume: u8,
    /// Stream state.
    playback: Playback,
    /// Menu or timer setup.
    interaction: Interaction,
    /// Running sleep timer setting.
    timer: TimerSetting,
    /// Baseline of the sleep timer.
    timer_started_at: u32,
    /// Timer sleep.
    sleep: Sleep,
    /// Display timeout.
    screen: Screen,
    /// Show the now-playing title when the display next times out.
    metadata_due: bool,
    /// Metadata display allowed, from the live signal.
    metadata_enabled: bool,
    /// Last title of the current stream.
    title: String<METADATA_LEN>,
    /// Configuration portal state.
    portal: PortalMode,
    /// Start of the quick-halt window.
    quick_halt_since: Option<u32>,
    /// Time of the last failed stream start.
    failed_start_at: Option<u32>,
    /// The error of a failed start is on screen or was shown; retries stay quiet.
    failure_shown: bool,
}

impl Session {
    /// State before boot reads the settings.
    const fn new() -> Self {
        Self {
            current: 0,
            volume: 0,
            persisted_volume: 0,
            playback: Playback::Idle,
            interaction: Interaction::Normal,
            timer: TimerSetting::DISABLED,
            timer_started_at: 0,
            sleep: Sleep::Asleep,
            screen: Screen::Off,
            metadata_due: false,
            metadata_enabled: false,
            title: String::new(),
            portal: PortalMode::Down,
            quick_halt_since: None,
            failed_start_at: None,
            failure_shown: false,
        }
    }
}

/// The stream radio.
pub struct Radio<P: Platform> {
    /// Fixed identity.
    config: BootConfig,
    /// Station presets.
    stations: StationStore,
    /// Editable copy of the presets, built the first time the portal opens.
    form: Option<StationForm>,
    /// Session state.
    session: Session,
    /// Persisted settings.
    store: P::Store,
    /// Encoder, button and mode signals.
    input: P::Input,
    /// Character display.
    display: P::Display,
    /// Stream player.
    audio: P::Audio,
    /// WiFi link.
    net: P::Net,
    /// Configuration web server.
    portal: P::Portal,
    /// Suspend and restart.
    power: P::Power,
    /// Millisecond time.
    clock: P::Clock,
}

impl<P: Platform> Radio<P> {
    /// A radio over the given devices. Nothing is read or shown until [`Radio::boot`].
    pub fn new(devices: Devices<P>, config: BootConfig) -> Self {
        Self {
            config,
            stations: StationStore::new(),
            form: None,
            session: Session::new(),
            store: devices.store,
            input: devices.input,
            display: devices.display,
            audio: devices.audio,
            net: devices.net,
            portal: devices.portal,
            power: devices.power,
            clock: devices.clock,
        }
    }

    /// Loads the settings, connects to WiFi and prepares the first tick.
    ///
    /// # Errors
    /// [`BootError::WifiUnavailable`] after showing the failure and requesting a restart.
    pub async fn boot(&mut self, options: BootOptions) -> Result<(), BootError> {
        info!("Booting with {:?}", options);
        if options.factory_reset {
            self.factory_reset().await;
        }

        let first_boot = !self.store.contains(Namespace::Settings, Field::Initialized).await;
        if first_boot || options.reload_defaults {
            screens::message(&mut self.display, "INITIALIZE\nLoading default\nstreams...");
            self.display.flush().await;
        }
        if options.reload_defaults && !first_boot {
            self.stations.seed_defaults(&mut self.store).await;
            self.store.store_int(Namespace::Settings, Field::CurrentStation, 0).await;
        }
        if self.stations.populate(&mut self.store).await {
            TimerSetting::enabled(TimerDuration::OneHour).save(&mut self.store).await;
            self.store.store_int(Namespace::Settings, Field::CurrentStation, 0).await;
            self.store
                .store_int(Namespace::Settings, Field::Volume, i32::from(DEFAULT_VOLUME))
                .await;
        }

        let woke_from_power_down = self.store.int_or(Namespace::Settings, Field::WakeOnClick, 0).await == 1;
        if woke_from_power_down {
            self.store.store_int(Namespace::Settings, Field::WakeOnClick, 0).await;
        }
        self.session.sleep = if options.play_immediately || woke_from_power_down {
            Sleep::Awake
        } else {
            Sleep::Asleep
        };
        self.session.current = wrap_index(self.store.int_or(Namespace::Settings, Field::CurrentStation, 0).await);

        if !self.connect_wifi(options.force_wifi_portal).await {
            warn!("No WiFi connection, restarting");
            screens::message(&mut self.display, "CONNECT FAIL\nWiFi Error\nRestarting...");
            self.display.flush().await;
            self.clock.delay_ms(DISPLAY_TIMEOUT_MS).await;
            self.power.restart().await;
            return Err(BootError::WifiUnavailable);
        }

        screens::splash(&mut self.display, self.config.name, self.session.sleep == Sleep::Asleep);

        let stored_volume = self.store.int_or(Namespace::Settings, Field::Volume, 0).await;
        // clamped to 0..=100
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let persisted = stored_volume.clamp(0, 100) as u8;
        // a muted radio would power down again on the first display timeout
        let volume = if persisted == 0 { DEFAULT_VOLUME } else { persisted };
        self.session.volume = volume;
        self.session.persisted_volume = persisted;
        self.input.set_position(POSITION_MAX - i32::from(volume));
        self.audio.set_volume(gain_for_volume(volume));

        let now = self.clock.now_ms();
        self.session.timer = TimerSetting::load(&mut self.store).await;
        self.session.timer_started_at = now;
        self.session.screen = Screen::On { since: now };
        self.display.flush().await;
        info!(
            "Boot complete: station {}, volume {}, timer {:?}",
            self.session.current, volume, self.session.timer
        );
        Ok(())
    }

    /// Erases every persisted value.
    async fn factory_reset(&mut self) {
        warn!("Factory reset");
        screens::message(&mut self.display, "NVS\nClearing Memory");
        self.display.flush().await;
        if let Err(e) = self.store.erase_all().await {
            warn!("Failed to erase storage: {:?}", e);
        }
        self.display.println("Complete");
        self.display.flush().await;
    }

    /// Joins the saved network, falling back to the captive portal.
    async fn connect_wifi(&mut self, force_portal: bool) -> bool {
        screens::wifi_portal(&mut self.display, self.config.portal_name);
        self.display.flush().await;

        if force_portal {
            info!("Captive portal requested");
            return self.run_captive_portal(None).await;
        }

        let credentials = match WifiCredentials::load(&mut self.store).await {
            Some(saved) => saved,
            None => self.config.default_credentials.clone(),
        };
        info!("Joining {}", credentials.ssid.as_str());
        if self.net.try_connect(&credentials).await {
            return true;
        }
        warn!("Join failed, opening the captive portal");
        self.run_captive_portal(Some(CAPTIVE_PORTAL_TIMEOUT_MS)).await
    }

    /// Runs the captive portal and saves what it collected.
    async fn run_captive_portal(&mut self, timeout_ms: Option<u32>) -> bool {
        match self
            .net
            .start_captive_portal(self.config.portal_name, timeout_ms)
            .await
        {
            Some(credentials) => {
                credentials.save(&mut self.store).await;
                true
            }
            None => false,
        }
    }
}
