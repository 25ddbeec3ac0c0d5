//! # Knob and mode inputs
//! Edge handlers for the rotary encoder, its push button and the toggle button, plus the input
//! device the control loop polls.
//!
//! The handlers only touch the shared [`ENCODER`] counter and a few atomics. The control loop
//! drains them once per tick.
use defmt::{Format, info};
use embassy_executor::Spawner;
use embassy_futures::select::select;
use embassy_rp::gpio::{Input, Level, Pull};
use embassy_time::{Duration, Timer};
use portable_atomic::{AtomicBool, Ordering};
use radio_core::encoder::{EncoderCounter, QuadratureDecoder};
use radio_core::input::{InputDevice, LiveSignals, POSITION_MAX, POSITION_MIN};
use radio_core::BootOptions;

use crate::task::power::signal_button_wake;
use crate::task::resources::{BootResources, KnobResources, ModeResources};

/// Position and click state shared between the edge handlers and the control loop.
static ENCODER: EncoderCounter = EncoderCounter::new(POSITION_MIN, POSITION_MAX);

/// Set by the toggle button handler, cleared when the control loop samples it.
static TOGGLE_PRESSED: AtomicBool = AtomicBool::new(false);

/// Quadrature transitions per detent of the knob.
const TRANSITIONS_PER_DETENT: i8 = 4;

/// Time the pull-ups get before the boot pins are read.
const PULL_UP_SETTLE: Duration = Duration::from_millis(2);

/// The push buttons of the radio.
#[derive(Debug, Format, Eq, PartialEq, Clone, Copy)]
pub enum PushButton {
    /// The encoder's own switch.
    Knob,
    /// The separate toggle button.
    Toggle,
}

/// Debounces a push button, pulled up and active low.
struct Debouncer<'a> {
    /// The input pin for the button
    input: Input<'a>,
    /// How long the level has to stay put
    debounce_duration: Duration,
}

impl<'a> Debouncer<'a> {
    /// Create a new `Debouncer`
    const fn new(input: Input<'a>) -> Self {
        Self {
            input,
            debounce_duration: Duration::from_millis(50),
        }
    }

    /// Waits for an edge, then for the debounce duration, and returns the new level once it
    /// differs from the level before the edge.
    async fn debounce(&mut self) -> Level {
        loop {
            let l1 = self.input.get_level();

            self.input.wait_for_any_edge().await;

            Timer::after(self.debounce_duration).await;

            let l2 = self.input.get_level();
            if l1 != l2 {
                break l2;
            }
        }
    }

    /// Returns once the button has been pressed down.
    async fn pressed(&mut self) {
        while self.debounce().await != Level::Low {}
    }
}

/// Counts detents from the two encoder phases.
#[embassy_executor::task]
async fn encoder_task(mut a: Input<'static>, mut b: Input<'static>) -> ! {
    let mut decoder = QuadratureDecoder::new(a.is_high(), b.is_high(), TRANSITIONS_PER_DETENT);
    loop {
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;
        let steps = decoder.update(a.is_high(), b.is_high());
        if steps != 0 {
            ENCODER.step(steps);
        }
    }
}

/// Reports debounced presses of one push button.
#[embassy_executor::task(pool_size = 2)]
async fn button_task(input: Input<'static>, button: PushButton) -> ! {
    let mut debouncer = Debouncer::new(input);
    loop {
        debouncer.pressed().await;
        info!("{:?} pressed", button);
        match button {
            PushButton::Knob => {
                ENCODER.press();
                signal_button_wake();
            }
            PushButton::Toggle => TOGGLE_PRESSED.store(true, Ordering::Release),
        }
    }
}

/// The knob, the toggle button and the mode switches as the control loop sees them.
pub struct KnobInput {
    /// Portal switch, active low.
    portal: Input<'static>,
    /// Metadata enable switch, active high.
    metadata: Input<'static>,
    /// Title request button, active low.
    title: Input<'static>,
}

impl KnobInput {
    /// Spawns the edge handlers and takes the mode switches.
    pub fn new(spawner: Spawner, knob: KnobResources, mode: ModeResources) -> Self {
        let a = Input::new(knob.clk_pin, Pull::Up);
        let b = Input::new(knob.dt_pin, Pull::Up);
        defmt::unwrap!(spawner.spawn(encoder_task(a, b)));
        defmt::unwrap!(spawner.spawn(button_task(
            Input::new(knob.button_pin, Pull::Up),
            PushButton::Knob
        )));
        defmt::unwrap!(spawner.spawn(button_task(
            Input::new(knob.toggle_pin, Pull::Up),
            PushButton::Toggle
        )));
        Self {
            portal: Input::new(mode.portal_pin, Pull::Up),
            metadata: Input::new(mode.metadata_pin, Pull::Down),
            title: Input::new(mode.title_pin, Pull::Up),
        }
    }

    /// Samples the boot pins, all active low. The portal switch held at power-up forces the
    /// WiFi credential portal.
    pub async fn boot_options(&self, boot: BootResources) -> BootOptions {
        let factory_reset = Input::new(boot.factory_reset_pin, Pull::Up);
        let reload_streams = Input::new(boot.reload_streams_pin, Pull::Up);
        let start = Input::new(boot.start_pin, Pull::Up);
        Timer::after(PULL_UP_SETTLE).await;
        let options = BootOptions {
            factory_reset: factory_reset.is_low(),
            reload_defaults: reload_streams.is_low(),
            force_wifi_portal: self.portal.is_low(),
            play_immediately: start.is_low(),
        };
        info!(
            "Boot pins: factory reset {}, reload {}, wifi portal {}, start {}",
            options.factory_reset,
            options.reload_defaults,
            options.force_wifi_portal,
            options.play_immediately
        );
        options
    }
}

impl InputDevice for KnobInput {
    fn poll_button_clicked(&mut self) -> bool {
        ENCODER.take_clicked()
    }

    fn poll_rotation_changed(&mut self) -> bool {
        ENCODER.take_changed()
    }

    fn read_position(&mut self) -> i32 {
        ENCODER.position()
    }

    fn set_position(&mut self, position: i32) {
        ENCODER.set_position(position);
    }

    fn recenter(&mut self, center: i32) -> i32 {
        ENCODER.recenter(center)
    }

    fn sample_signals(&mut self) -> LiveSignals {
        LiveSignals {
            portal_switch: self.portal.is_low(),
            metadata_enabled: self.metadata.is_high(),
            title_requested: self.title.is_low(),
            toggle_pressed: TOGGLE_PRESSED.swap(false, Ordering::AcqRel),
        }
    }
}
