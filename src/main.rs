//! # Pico Stream Radio
//! Firmware entry point: splits the peripherals, starts the tasks and runs the radio's control
//! loop.
//!
//! The control loop itself lives in `radio-core` and sees the hardware only through the device
//! types of the [`task`] modules. Everything that has to react faster than a tick (encoder
//! edges, the display bus, the MP3 decoder, the web server) runs in its own task.

// we are in an environment with constrained resources, so we do not use the standard library and we define a different entry point.
#![no_std]
#![no_main]

mod task;

use defmt::{error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker};
use radio_core::{BootConfig, Devices, Platform, Radio, TickOutcome};
use {defmt_rtt as _, panic_probe as _};

use crate::task::audio::{StreamClient, decoder_task};
use crate::task::display::{OledText, display_task};
use crate::task::knob::KnobInput;
use crate::task::network::{WifiLink, compiled_credentials};
use crate::task::portal::{HttpPortal, portal_task};
use crate::task::power::{EmbassyClock, WatchdogPower};
use crate::task::resources::{
    AssignedResources, AudioResources, BootResources, DisplayResources, FlashResources, KnobResources,
    ModeResources, PowerResources, WifiResources,
};
use crate::task::storage::FlashStore;

/// Interval of the control loop.
const TICK: Duration = Duration::from_millis(5);

/// The Pico W's devices.
struct PicoRadio;

impl Platform for PicoRadio {
    type Store = FlashStore;
    type Input = KnobInput;
    type Display = OledText;
    type Audio = StreamClient;
    type Net = WifiLink;
    type Portal = HttpPortal;
    type Power = WatchdogPower;
    type Clock = EmbassyClock;
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Program start");

    // Initialize the peripherals for the RP2040
    let p = embassy_rp::init(Default::default());
    // and assign the peripherals to the places, where we will use them
    let r = split_resources!(p);

    unwrap!(spawner.spawn(display_task(r.display)));
    unwrap!(spawner.spawn(decoder_task(r.audio)));

    let input = KnobInput::new(spawner, r.knob, r.mode);
    let options = input.boot_options(r.boot).await;

    let stack = task::network::start(spawner, r.wifi).await;
    unwrap!(spawner.spawn(portal_task(stack)));

    let devices = Devices::<PicoRadio> {
        store: FlashStore::new(r.flash),
        input,
        display: OledText::new(),
        audio: StreamClient::new(stack),
        net: WifiLink::new(stack),
        portal: HttpPortal,
        power: WatchdogPower::new(r.power),
        clock: EmbassyClock,
    };
    let config = BootConfig {
        name: "Pico Stream Radio",
        version: env!("CARGO_PKG_VERSION"),
        portal_name: "PicoStreamRadio",
        default_credentials: compiled_credentials(),
    };
    let mut radio = Radio::new(devices, config);

    if let Err(e) = radio.boot(options).await {
        error!("Boot failed: {:?}", e);
        return;
    }
    info!("Radio running");

    let mut ticker = Ticker::every(TICK);
    loop {
        if radio.tick().await == TickOutcome::Restart {
            warn!("Control loop asked for a restart");
            return;
        }
        ticker.next().await;
    }
}
