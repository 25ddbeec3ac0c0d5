//! One tick of the control loop and the transitions it drives.
use super::{
    DEFAULT_VOLUME, DISPLAY_TIMEOUT_MS, Interaction, Platform, Playback, QUICK_HALT_WINDOW_MS, Radio, Screen,
    Sleep, TickOutcome,
};
use crate::audio::{AudioPipeline, MetadataKind, gain_for_volume};
use crate::clock::{Clock, expired};
use crate::display::{TextDisplay, screens};
use crate::input::{InputDevice, LiveSignals, MENU_CENTER, POSITION_MAX};
use crate::network::Network;
use crate::portal::{PortalMode, StationForm, WebPortal};
use crate::power::PowerControl;
use crate::station::{next_index, previous_index, wrap_index};
use crate::storage::{Field, KeyValueStore, Namespace};
use crate::timer::TimerSetting;

/// A station index as stored.
fn slot_value(index: usize) -> i32 {
    i32::try_from(index).unwrap_or_default()
}

impl<P: Platform> Radio<P> {
    /// Runs one iteration of the control loop.
    pub async fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now_ms();
        let signals = self.input.sample_signals();
        self.session.metadata_enabled = signals.metadata_enabled;

        if self.session.sleep == Sleep::Asleep {
            self.check_wake(now);
        } else {
            self.service_stream(now).await;
            self.handle_signals(signals, now).await;
            if self.input.poll_button_clicked()
                && self.handle_click(now).await == TickOutcome::Restart
            {
                return TickOutcome::Restart;
            }
            if self.input.poll_rotation_changed() {
                self.handle_rotation(now);
            }
        }

        if let Screen::On { since } = self.session.screen {
            if expired(now, since, DISPLAY_TIMEOUT_MS) && self.on_display_timeout(now).await == TickOutcome::Restart {
                return TickOutcome::Restart;
            }
        }

        self.check_sleep_timer(now).await;
        self.service_portal(signals.portal_switch, now).await;
        self.display.flush().await;
        TickOutcome::Continue
    }

    /// Re-arms the display timeout.
    const fn touch_display(&mut self, now: u32) {
        self.session.screen = Screen::On { since: now };
    }

    /// Leaves timer sleep on any click or turn.
    fn check_wake(&mut self, now: u32) {
        // take both flags so the waking turn does not also change the volume
        let clicked = self.input.poll_button_clicked();
        let turned = self.input.poll_rotation_changed();
        if clicked || turned {
            info!("Waking up");
            self.session.sleep = Sleep::Awake;
            self.session.timer_started_at = now;
            self.session.failed_start_at = None;
            screens::message(&mut self.display, "WAKE UP");
            self.touch_display(now);
        }
    }

    /// Pumps the open stream, or starts the current station.
    async fn service_stream(&mut self, now: u32) {
        match self.session.playback {
            Playback::Streaming => {
                if !self.audio.pump().await {
                    warn!("Stream {} closed", self.session.current);
                    self.stop_stream().await;
                }
                while let Some(event) = self.audio.poll_metadata() {
                    if event.kind == MetadataKind::Title {
                        self.session.title = event.text;
                    }
                }
            }
            Playback::Idle => {
                if let Some(failed_at) = self.session.failed_start_at {
                    if !expired(now, failed_at, DISPLAY_TIMEOUT_MS) {
                        return;
                    }
                    self.session.failed_start_at = None;
                }
                self.start_stream(now).await;
            }
        }
    }

    /// Starts the current station, reverting to the last one that played if that fails.
    async fn start_stream(&mut self, now: u32) {
        let index = self.session.current;
        let station = self.stations.get(index);
        let started = station.has_valid_protocol() && self.audio.begin(&station.url).await;
        if started {
            info!("Streaming station {}", index);
            self.session.playback = Playback::Streaming;
            self.session.failure_shown = false;
            // only a station that actually played is remembered
            self.store
                .store_int(Namespace::Settings, Field::CurrentStation, slot_value(index))
                .await;
        } else {
            warn!("Station {} failed to start", index);
            self.session.current = wrap_index(self.store.int_or(Namespace::Settings, Field::CurrentStation, 0).await);
            self.session.failed_start_at = Some(now);
            if self.session.failure_shown {
                // paced retry, the screen stays as it is
                return;
            }
            self.session.failure_shown = true;
            if let Interaction::Menu { cursor, .. } = &mut self.session.interaction {
                *cursor = self.session.current;
            }
            screens::message(&mut self.display, "ERROR\nMissing URL\nReverting");
        }
        self.session.title.clear();
        self.session.metadata_due = true;
        self.touch_display(now);
    }

    /// Stops the stream so the next tick starts the current station.
    pub(super) async fn stop_stream(&mut self) {
        self.audio.end().await;
        self.session.playback = Playback::Idle;
        self.session.failed_start_at = None;
        self.session.failure_shown = false;
    }

    /// The title request and toggle inputs.
    async fn handle_signals(&mut self, signals: LiveSignals, now: u32) {
        if signals.title_requested && self.session.screen == Screen::Off {
            screens::now_playing(&mut self.display, &self.session.title);
            self.touch_display(now);
        }
        if signals.toggle_pressed {
            if let Interaction::Menu { saved_position, .. } = self.session.interaction {
                self.input.set_position(saved_position);
                self.session.interaction = Interaction::Normal;
            }
            self.toggle_to_previous().await;
            self.touch_display(now);
        }
    }

    /// Switches to the station played before the current one, remembering the current one.
    async fn toggle_to_previous(&mut self) {
        let previous = self.store.int_or(Namespace::Settings, Field::PreviousStation, 0).await;
        self.store
            .store_int(Namespace::Settings, Field::PreviousStation, slot_value(self.session.current))
            .await;
        self.session.current = wrap_index(previous);
        info!("Toggled to station {}", self.session.current);
        self.stop_stream().await;
        self.show_status();
    }

    /// Interprets a click by the current mode.
    async fn handle_click(&mut self, now: u32) -> TickOutcome {
        let quick_halt = self
            .session
            .quick_halt_since
            .take()
            .is_some_and(|since| !expired(now, since, QUICK_HALT_WINDOW_MS));

        if self.session.volume == 0 {
            self.enter_timer_setup().await;
        } else if let Interaction::TimerSetup { pending } = self.session.interaction {
            self.commit_timer_setup(pending, now).await;
        } else if quick_halt {
            info!("Quick halt");
            self.power_down().await;
            return TickOutcome::Restart;
        } else if let Interaction::Menu {
            cursor,
            saved_position,
            toggle,
        } = self.session.interaction
        {
            self.input.set_position(saved_position);
            self.session.interaction = Interaction::Normal;
            if toggle.is_some() {
                self.toggle_to_previous().await;
            } else {
                self.session.current = cursor;
                self.stop_stream().await;
                self.show_status();
            }
        } else {
            self.open_menu().await;
        }
        self.touch_display(now);
        TickOutcome::Continue
    }

    /// Unmutes and starts choosing the sleep timer.
    async fn enter_timer_setup(&mut self) {
        let restored = if self.session.persisted_volume == 0 {
            DEFAULT_VOLUME
        } else {
            self.session.persisted_volume
        };
        self.session.volume = restored;
        self.audio.set_volume(gain_for_volume(restored));
        let persisted = TimerSetting::load(&mut self.store).await;
        // parked away from the bounds so a turn either way counts
        self.input.set_position(MENU_CENTER);
        self.session.interaction = Interaction::TimerSetup { pending: persisted };
        screens::timer_setup(&mut self.display, persisted);
    }

    /// Stores and starts the chosen timer setting.
    async fn commit_timer_setup(&mut self, chosen: TimerSetting, now: u32) {
        self.session.interaction = Interaction::Normal;
        self.session.timer = chosen;
        chosen.save(&mut self.store).await;
        if chosen.enabled {
            self.session.timer_started_at = now;
            self.session.quick_halt_since = Some(now);
        }
        info!("Timer saved: {:?}", chosen);
        screens::timer_saved(&mut self.display, chosen);
        self.input
            .set_position(POSITION_MAX - i32::from(self.session.persisted_volume));
    }

    /// Opens the station menu with the toggle armed.
    async fn open_menu(&mut self) {
        let saved_position = self.input.read_position();
        self.input.set_position(MENU_CENTER);
        let previous = wrap_index(self.store.int_or(Namespace::Settings, Field::PreviousStation, 0).await);
        self.session.interaction = Interaction::Menu {
            cursor: self.session.current,
            saved_position,
            toggle: Some(previous),
        };
        self.show_menu();
    }

    /// Interprets a turn by the current mode.
    fn handle_rotation(&mut self, now: u32) {
        self.session.quick_halt_since = None;
        match self.session.interaction {
            Interaction::Menu {
                cursor, saved_position, ..
            } => {
                let reading = self.input.recenter(MENU_CENTER);
                let cursor = match reading.cmp(&MENU_CENTER) {
                    core::cmp::Ordering::Greater => previous_index(cursor),
                    core::cmp::Ordering::Less => next_index(cursor),
                    core::cmp::Ordering::Equal => cursor,
                };
                self.session.interaction = Interaction::Menu {
                    cursor,
                    saved_position,
                    toggle: None,
                };
                self.show_menu();
            }
            Interaction::TimerSetup { pending } => {
                self.input.recenter(MENU_CENTER);
                let pending = pending.next();
                self.session.interaction = Interaction::TimerSetup { pending };
                screens::timer_choice(&mut self.display, pending);
            }
            Interaction::Normal => {
                let position = self.input.read_position();
                // bounded to 0..=100 by the encoder
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let volume = (POSITION_MAX - position).clamp(0, 100) as u8;
                self.session.volume = volume;
                self.audio.set_volume(gain_for_volume(volume));
                self.show_status();
                self.session.metadata_due = true;
            }
        }
        self.touch_display(now);
    }

    /// Settles everything that waits for the display to go idle.
    async fn on_display_timeout(&mut self, now: u32) -> TickOutcome {
        self.display.clear();
        self.session.screen = Screen::Off;

        if self.session.volume == 0 {
            self.power_down().await;
            return TickOutcome::Restart;
        }

        if let Interaction::Menu { saved_position, .. } = self.session.interaction {
            self.input.set_position(saved_position);
            self.session.interaction = Interaction::Normal;
        }

        if self.session.metadata_due {
            self.session.metadata_due = false;
            if self.session.metadata_enabled && screens::now_playing(&mut self.display, &self.session.title) {
                self.touch_display(now);
            }
        }

        if self.session.portal == PortalMode::Up {
            screens::portal_open(&mut self.display, self.net.local_ip());
        }

        if let Interaction::TimerSetup { .. } = self.session.interaction {
            self.session.interaction = Interaction::Normal;
            self.session.timer = TimerSetting::load(&mut self.store).await;
            screens::timer_not_changed(&mut self.display, self.session.timer);
            self.input
                .set_position(POSITION_MAX - i32::from(self.session.persisted_volume));
            self.touch_display(now);
        }

        if self.session.volume != self.session.persisted_volume {
            self.store
                .store_int(Namespace::Settings, Field::Volume, i32::from(self.session.volume))
                .await;
            self.session.persisted_volume = self.session.volume;
        }
        TickOutcome::Continue
    }

    /// Puts the radio to timer sleep when the sleep timer runs out.
    async fn check_sleep_timer(&mut self, now: u32) {
        if self.session.sleep == Sleep::Awake
            && self
                .session
                .timer
                .has_expired(now, self.session.timer_started_at)
        {
            info!("Sleep timer expired");
            self.stop_stream().await;
            self.session.sleep = Sleep::Asleep;
            screens::message(&mut self.display, "SLEEPING");
            self.touch_display(now);
        }
    }

    /// Shuts everything down, halts until the button wakes the CPU, then asks for a restart.
    async fn power_down(&mut self) {
        warn!("Powering down");
        screens::power_down(&mut self.display, self.config.version);
        self.display.flush().await;
        self.stop_stream().await;
        self.session.sleep = Sleep::Asleep;
        self.store.store_int(Namespace::Settings, Field::WakeOnClick, 1).await;
        self.power.arm_button_wake();
        self.net.disable_radio().await;
        self.clock.delay_ms(DISPLAY_TIMEOUT_MS).await;
        self.display.clear();
        self.display.flush().await;

        self.power.suspend().await;

        screens::message(&mut self.display, "SYSTEM START UP");
        self.display.flush().await;
        self.power.disable_wake_sources();
        self.power.restart().await;
    }

    /// Drives the configuration portal from the level of its switch.
    ///
    /// A submitted save is committed on the following tick, before the switch level is looked
    /// at.
    async fn service_portal(&mut self, switch: bool, now: u32) {
        match self.session.portal {
            PortalMode::SavePending => {
                self.commit_portal(switch, now).await;
                return;
            }
            PortalMode::Up => {
                if let Some(form) = self.form.as_mut() {
                    if self.portal.process(form).await {
                        info!("Portal save submitted");
                        self.session.portal = PortalMode::SavePending;
                        return;
                    }
                }
            }
            PortalMode::Down | PortalMode::Idle => {}
        }

        if self.session.portal == PortalMode::Idle && !switch {
            self.session.portal = PortalMode::Down;
        }

        if switch {
            if self.session.portal == PortalMode::Down {
                let stations = &self.stations;
                let form = self.form.get_or_insert_with(|| StationForm::from_stations(stations));
                self.portal.start(form).await;
                self.session.portal = PortalMode::Up;
                info!("Portal open");
                screens::portal_open(&mut self.display, self.net.local_ip());
                self.touch_display(now);
            }
        } else if self.session.portal != PortalMode::Down {
            self.portal.stop().await;
            self.session.portal = PortalMode::Down;
            info!("Portal closed");
            screens::message(&mut self.display, "PORTAL CLOSED");
            self.touch_display(now);
        }
    }

    /// Copies the submitted form into the stations and persists them.
    async fn commit_portal(&mut self, switch: bool, now: u32) {
        if let Some(form) = &self.form {
            self.stations.set_all(form.entries());
        }
        self.stations.persist(&mut self.store).await;
        self.portal.stop().await;
        self.session.portal = if switch { PortalMode::Idle } else { PortalMode::Down };
        screens::message(&mut self.display, "SAVED");
        self.touch_display(now);
    }
}
