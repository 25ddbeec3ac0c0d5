use embassy_futures::block_on;
use std::string::{String, ToString};
use std::vec::Vec;

use super::*;
use crate::audio::Metadata;
use crate::clock::Clock;
use crate::display::{ROWS, TextGrid};
use crate::input::MENU_CENTER;
use crate::network::WifiCredentials;
use crate::portal::PortalMode;
use crate::station::{DEFAULT_STATIONS, STATION_SLOTS};
use crate::storage::{Field, Namespace};
use crate::timer::{TimerDuration, TimerSetting};
use crate::testing::{
    FakeNetwork, FakePortal, HostPlatform, ManualClock, MemoryStore, RecordingAudio, RecordingPower, ScriptedInput,
};

type TestRadio = Radio<HostPlatform>;

const TICK_MS: u32 = 20;

fn config() -> BootConfig {
    BootConfig {
        name: "Pico Stream Radio",
        version: "0.1.0",
        portal_name: "PicoStreamRadio",
        default_credentials: WifiCredentials::new("home", "secret"),
    }
}

fn radio_with(store: MemoryStore) -> TestRadio {
    Radio::new(
        Devices {
            store,
            input: ScriptedInput::default(),
            display: TextGrid::new(),
            audio: RecordingAudio::default(),
            net: FakeNetwork::default(),
            portal: FakePortal::default(),
            power: RecordingPower::default(),
            clock: ManualClock::default(),
        },
        config(),
    )
}

/// A store that went through a first boot, with slot 6 left without a URL and the timer off.
fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::default();
    store.put_number(Namespace::Settings, Field::Initialized, 1);
    store.put_number(Namespace::Settings, Field::Volume, 40);
    store.put_number(Namespace::Settings, Field::TimerEnabled, 0);
    for (slot, (tag, url)) in (0u8..).zip(DEFAULT_STATIONS) {
        store.put_text(Namespace::Station(slot), Field::Tag, tag);
        let url = if slot == 5 { "" } else { url };
        store.put_text(Namespace::Station(slot), Field::Url, url);
    }
    store
}

fn playing(store: MemoryStore) -> TestRadio {
    let mut radio = radio_with(store);
    let options = BootOptions {
        play_immediately: true,
        ..BootOptions::default()
    };
    assert_eq!(block_on(radio.boot(options)), Ok(()));
    assert_eq!(tick(&mut radio), TickOutcome::Continue);
    radio
}

fn tick(radio: &mut TestRadio) -> TickOutcome {
    radio.clock.advance(TICK_MS);
    block_on(radio.tick())
}

fn click(radio: &mut TestRadio) -> TickOutcome {
    radio.input.encoder.press();
    tick(radio)
}

fn turn(radio: &mut TestRadio, detents: i32) -> TickOutcome {
    radio.input.encoder.step(detents);
    tick(radio)
}

fn wait(radio: &mut TestRadio, ms: u32) -> TickOutcome {
    radio.clock.advance(ms);
    tick(radio)
}

fn screen(radio: &TestRadio) -> Vec<String> {
    (0..ROWS)
        .map(|row| radio.display.line(row).as_str().to_string())
        .collect()
}

fn url_of(slot: usize) -> String {
    DEFAULT_STATIONS[slot].1.to_string()
}

#[test]
fn first_boot_seeds_settings_and_waits_asleep() {
    let mut radio = radio_with(MemoryStore::default());
    assert_eq!(block_on(radio.boot(BootOptions::default())), Ok(()));

    assert_eq!(radio.store.number(Namespace::Settings, Field::Volume), Some(50));
    assert_eq!(radio.store.number(Namespace::Settings, Field::TimerEnabled), Some(1));
    assert_eq!(radio.store.number(Namespace::Settings, Field::TimerDuration), Some(0));
    assert!(radio.session.timer.enabled);
    assert_eq!(radio.input.encoder.position(), 50);
    assert_eq!(screen(&radio)[3], "Turn Knob to Play");

    tick(&mut radio);
    assert!(radio.audio.begun.is_empty());

    turn(&mut radio, 1);
    assert_eq!(screen(&radio)[0], "WAKE UP");
    assert_eq!(radio.session.volume, 50, "the waking turn does not change the volume");
    tick(&mut radio);
    assert_eq!(radio.audio.begun, [url_of(0)]);
}

#[test]
fn power_down_flag_wakes_into_playback_once() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::WakeOnClick, 1);
    let mut radio = radio_with(store);
    block_on(radio.boot(BootOptions::default())).unwrap();
    assert_eq!(radio.session.sleep, Sleep::Awake);
    assert_eq!(radio.store.number(Namespace::Settings, Field::WakeOnClick), Some(0));
}

#[test]
fn stream_start_remembers_the_station_and_pumps() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::CurrentStation, 7);
    let mut radio = playing(store);
    assert_eq!(radio.audio.begun, [url_of(7)]);
    assert_eq!(radio.session.playback, Playback::Streaming);
    assert_eq!(radio.audio.gain, 0.4);
    tick(&mut radio);
    tick(&mut radio);
    assert_eq!(radio.audio.pumps, 2);
}

#[test]
fn closed_stream_is_restarted() {
    let mut radio = playing(seeded_store());
    radio.audio.playing = false;
    tick(&mut radio);
    assert_eq!(radio.session.playback, Playback::Idle);
    tick(&mut radio);
    assert_eq!(radio.audio.begun, [url_of(0), url_of(0)]);
}

#[test]
fn saved_credentials_are_preferred() {
    let mut store = seeded_store();
    store.put_text(Namespace::Settings, Field::WifiSsid, "attic");
    store.put_text(Namespace::Settings, Field::WifiPassword, "hunter22");
    let mut radio = radio_with(store);
    block_on(radio.boot(BootOptions::default())).unwrap();
    assert_eq!(radio.net.attempts, [WifiCredentials::new("attic", "hunter22")]);

    let mut fallback = radio_with(seeded_store());
    block_on(fallback.boot(BootOptions::default())).unwrap();
    assert_eq!(fallback.net.attempts, [WifiCredentials::new("home", "secret")]);
    assert!(fallback.net.portal_timeouts.is_empty());
}

#[test]
fn failed_join_falls_back_to_the_captive_portal() {
    let mut radio = radio_with(seeded_store());
    radio.net.joins = false;
    radio.net.portal_result = Some(WifiCredentials::new("cabin", "pinecone"));
    assert_eq!(block_on(radio.boot(BootOptions::default())), Ok(()));
    assert_eq!(radio.net.portal_timeouts, [Some(CAPTIVE_PORTAL_TIMEOUT_MS)]);
    assert_eq!(radio.store.text(Namespace::Settings, Field::WifiSsid), Some("cabin"));
}

#[test]
fn no_wifi_at_all_restarts() {
    let mut radio = radio_with(seeded_store());
    radio.net.joins = false;
    assert_eq!(
        block_on(radio.boot(BootOptions::default())),
        Err(BootError::WifiUnavailable)
    );
    assert_eq!(screen(&radio)[..3], ["CONNECT FAIL", "WiFi Error", "Restarting..."]);
    assert_eq!(radio.clock.now_ms(), DISPLAY_TIMEOUT_MS);
    assert_eq!(radio.power.calls, ["restart"]);
}

#[test]
fn forced_portal_waits_without_a_deadline() {
    let mut radio = radio_with(seeded_store());
    radio.net.portal_result = Some(WifiCredentials::new("cabin", ""));
    let options = BootOptions {
        force_wifi_portal: true,
        ..BootOptions::default()
    };
    block_on(radio.boot(options)).unwrap();
    assert!(radio.net.attempts.is_empty());
    assert_eq!(radio.net.portal_timeouts, [None]);
}

#[test]
fn factory_reset_and_reload_restore_the_defaults() {
    let mut store = seeded_store();
    store.put_text(Namespace::Station(0), Field::Tag, "Edited");
    store.put_number(Namespace::Settings, Field::Volume, 10);
    let mut radio = radio_with(store);
    let options = BootOptions {
        factory_reset: true,
        ..BootOptions::default()
    };
    block_on(radio.boot(options)).unwrap();
    assert_eq!(radio.stations.get(0).tag.as_str(), DEFAULT_STATIONS[0].0);
    assert_eq!(radio.session.volume, DEFAULT_VOLUME);

    let mut store = seeded_store();
    store.put_text(Namespace::Station(0), Field::Tag, "Edited");
    store.put_number(Namespace::Settings, Field::CurrentStation, 9);
    let mut radio = radio_with(store);
    let options = BootOptions {
        reload_defaults: true,
        ..BootOptions::default()
    };
    block_on(radio.boot(options)).unwrap();
    assert_eq!(radio.stations.get(0).tag.as_str(), DEFAULT_STATIONS[0].0);
    assert_eq!(radio.stations.get(5).url.as_str(), DEFAULT_STATIONS[5].1);
    assert_eq!(radio.session.current, 0);
    assert_eq!(radio.session.volume, 40, "a reload keeps the other settings");
}

#[test]
fn turning_sets_an_inverted_volume_and_persists_it_when_settled() {
    let mut radio = playing(seeded_store());
    assert_eq!(radio.input.encoder.position(), 60);
    turn(&mut radio, -25);
    assert_eq!(radio.session.volume, 65);
    assert_eq!(radio.audio.gain, 0.65);
    assert_eq!(screen(&radio)[2], "volume: 65");
    assert_eq!(radio.store.number(Namespace::Settings, Field::Volume), Some(40));

    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(radio.store.number(Namespace::Settings, Field::Volume), Some(65));
}

#[test]
fn status_shows_the_time_left() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::TimerEnabled, 1);
    store.put_number(Namespace::Settings, Field::TimerDuration, 1);
    let mut radio = playing(store);
    radio.net.rssi = -72;
    turn(&mut radio, 1);
    assert_eq!(screen(&radio), ["Psyndora Chillout", "timer :  2:00", "signal: -72 weak", "volume: 39"]);
}

#[test]
fn click_at_zero_volume_opens_timer_setup_with_the_stored_volume() {
    let mut radio = playing(seeded_store());
    turn(&mut radio, 40);
    assert_eq!(radio.session.volume, 0);
    assert_eq!(screen(&radio)[0], "ZERO FUNCTION");

    click(&mut radio);
    assert_eq!(
        radio.session.interaction,
        Interaction::TimerSetup {
            pending: TimerSetting::DISABLED
        }
    );
    assert_eq!(radio.session.volume, 40);
    assert_eq!(radio.audio.gain, 0.4);
    assert_eq!(screen(&radio)[..2], ["TIMER", "Disabled"]);
}

#[test]
fn timer_setup_cycles_through_disabled_and_commits() {
    let mut radio = playing(seeded_store());
    turn(&mut radio, 40);
    click(&mut radio);

    let mut shown = Vec::new();
    for _ in 0..8 {
        turn(&mut radio, 1);
        assert_eq!(screen(&radio)[0], "SET TIMER");
        shown.push(screen(&radio)[2].clone());
    }
    assert_eq!(
        shown,
        ["1 hour", "2 hour", "4 hour", "6 hour", "8 hour", "12 hour", "Disabled", "1 hour"]
    );
    assert_eq!(radio.session.volume, 40, "turning in setup leaves the volume alone");

    click(&mut radio);
    assert_eq!(radio.session.interaction, Interaction::Normal);
    assert_eq!(screen(&radio)[..2], ["TIMER SAVED", "1 hour"]);
    assert_eq!(radio.store.number(Namespace::Settings, Field::TimerEnabled), Some(1));
    assert_eq!(radio.store.number(Namespace::Settings, Field::TimerDuration), Some(0));
    assert_eq!(radio.input.encoder.position(), 60);
    assert!(radio.session.timer.enabled);
}

#[test]
fn timer_setup_times_out_without_changes() {
    let mut radio = playing(seeded_store());
    turn(&mut radio, 40);
    click(&mut radio);
    turn(&mut radio, 1);
    turn(&mut radio, 1);

    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(radio.session.interaction, Interaction::Normal);
    assert_eq!(screen(&radio)[..3], ["TIMER", "Not Changed", "Disabled"]);
    assert!(matches!(radio.session.screen, Screen::On { .. }));
    assert!(!radio.session.timer.enabled);
    assert_eq!(radio.store.number(Namespace::Settings, Field::TimerEnabled), Some(0));
    assert_eq!(radio.input.encoder.position(), 60);
    assert!(radio.power.calls.is_empty());
}

#[test]
fn menu_shows_slot_numbers_for_missing_urls_and_reverts_on_selection() {
    let mut radio = playing(seeded_store());
    click(&mut radio);
    assert!(matches!(radio.session.interaction, Interaction::Menu { .. }));
    assert_eq!(radio.input.encoder.position(), MENU_CENTER);

    for _ in 0..5 {
        turn(&mut radio, -1);
    }
    assert_eq!(
        screen(&radio),
        ["Psyndora Chillout", "Simply Oldies", "6", "Synphaera Radio"]
    );
    assert!(!radio.display.row(2)[0].inverted);
    assert!(!radio.stations.is_valid_url(5));

    click(&mut radio);
    assert_eq!(radio.session.current, 5);
    assert_eq!(radio.input.encoder.position(), 60, "volume position restored");

    tick(&mut radio);
    assert_eq!(radio.session.current, 0);
    assert_eq!(screen(&radio)[..3], ["ERROR", "Missing URL", "Reverting"]);
    assert_eq!(radio.audio.begun, [url_of(0)]);
    assert_eq!(radio.store.number(Namespace::Settings, Field::CurrentStation), Some(0));

    tick(&mut radio);
    assert_eq!(radio.audio.begun.len(), 1, "no retry inside the pause");
    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(radio.audio.begun, [url_of(0), url_of(0)]);
}

#[test]
fn refused_stream_reverts_like_a_bad_url() {
    let mut radio = playing(seeded_store());
    radio.audio.refused.push(url_of(2));
    click(&mut radio);
    turn(&mut radio, -1);
    turn(&mut radio, -1);
    click(&mut radio);
    tick(&mut radio);
    assert_eq!(radio.audio.begun, [url_of(0), url_of(2)]);
    assert_eq!(radio.session.current, 0);
    assert_eq!(screen(&radio)[1], "Missing URL");
}

#[test]
fn menu_wraps_backwards_from_the_first_slot() {
    let mut radio = playing(seeded_store());
    click(&mut radio);
    turn(&mut radio, 1);
    let Interaction::Menu { cursor, toggle, .. } = radio.session.interaction else {
        panic!("menu closed");
    };
    assert_eq!(cursor, 35);
    assert_eq!(toggle, None);
    assert_eq!(screen(&radio)[2], "Mr. Liberty Show");
    assert!(radio.display.row(2)[0].inverted);
    assert_eq!(radio.input.encoder.position(), MENU_CENTER);
}

#[test]
fn click_on_a_fresh_menu_toggles_to_the_previous_station() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::PreviousStation, 3);
    let mut radio = playing(store);
    click(&mut radio);
    assert_eq!(screen(&radio)[..3], ["Psyndora Chillout", "", "> Rare 80s Music"]);

    click(&mut radio);
    assert_eq!(radio.session.current, 3);
    assert_eq!(radio.session.interaction, Interaction::Normal);
    assert_eq!(radio.store.number(Namespace::Settings, Field::PreviousStation), Some(0));
    assert_eq!(screen(&radio)[0], "Rare 80s Music");
    assert_eq!(radio.input.encoder.position(), 60);
    tick(&mut radio);
    assert_eq!(radio.audio.begun, [url_of(0), url_of(3)]);
}

#[test]
fn scrolling_disarms_the_toggle_for_good() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::PreviousStation, 3);
    let mut radio = playing(store);
    click(&mut radio);
    turn(&mut radio, -1);
    turn(&mut radio, 1);
    click(&mut radio);
    assert_eq!(radio.session.current, 0);
    assert_eq!(radio.store.number(Namespace::Settings, Field::PreviousStation), Some(3));
}

#[test]
fn toggle_input_switches_back_and_forth() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::PreviousStation, 2);
    let mut radio = playing(store);
    radio.input.signals.toggle_pressed = true;
    tick(&mut radio);
    assert_eq!(radio.session.current, 2);
    tick(&mut radio);
    radio.input.signals.toggle_pressed = true;
    tick(&mut radio);
    assert_eq!(radio.session.current, 0);
    assert_eq!(radio.audio.begun, [url_of(0), url_of(2)]);
}

#[test]
fn display_timeout_closes_the_menu() {
    let mut radio = playing(seeded_store());
    click(&mut radio);
    turn(&mut radio, -1);
    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(radio.session.interaction, Interaction::Normal);
    assert_eq!(radio.session.current, 0);
    assert_eq!(radio.input.encoder.position(), 60);
}

#[test]
fn zero_volume_timeout_powers_down_and_restarts() {
    let mut radio = playing(seeded_store());
    turn(&mut radio, 40);
    assert_eq!(wait(&mut radio, DISPLAY_TIMEOUT_MS), TickOutcome::Restart);

    assert_eq!(radio.power.calls, ["arm", "suspend", "disarm", "restart"]);
    assert!(!radio.audio.playing);
    assert!(radio.net.radio_off);
    assert_eq!(radio.store.number(Namespace::Settings, Field::WakeOnClick), Some(1));
    assert_eq!(radio.store.number(Namespace::Settings, Field::Volume), Some(40));
    assert_eq!(screen(&radio)[0], "SYSTEM START UP");
}

#[test]
fn second_click_right_after_arming_the_timer_halts() {
    let mut radio = playing(seeded_store());
    turn(&mut radio, 40);
    click(&mut radio);
    turn(&mut radio, 1);
    click(&mut radio);
    assert!(radio.session.timer.enabled);

    radio.clock.advance(1_000);
    assert_eq!(click(&mut radio), TickOutcome::Restart);
    assert_eq!(radio.power.calls, ["arm", "suspend", "disarm", "restart"]);
}

#[test]
fn quick_halt_needs_an_untouched_knob_and_the_window() {
    let mut radio = playing(seeded_store());
    turn(&mut radio, 40);
    click(&mut radio);
    turn(&mut radio, 1);
    click(&mut radio);
    turn(&mut radio, -1);
    assert_eq!(click(&mut radio), TickOutcome::Continue);
    assert!(matches!(radio.session.interaction, Interaction::Menu { .. }));

    let mut late = playing(seeded_store());
    turn(&mut late, 40);
    click(&mut late);
    turn(&mut late, 1);
    click(&mut late);
    late.clock.advance(QUICK_HALT_WINDOW_MS);
    assert_eq!(click(&mut late), TickOutcome::Continue);
    assert!(late.power.calls.is_empty());
}

#[test]
fn sleep_timer_expiry_sleeps_until_touched() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::TimerEnabled, 1);
    let mut radio = playing(store);
    wait(&mut radio, TimerDuration::OneHour.as_millis());
    assert_eq!(radio.session.sleep, Sleep::Asleep);
    assert_eq!(screen(&radio)[0], "SLEEPING");
    assert!(!radio.audio.playing);

    wait(&mut radio, 60_000);
    assert_eq!(radio.audio.begun.len(), 1);

    click(&mut radio);
    assert_eq!(screen(&radio)[0], "WAKE UP");
    assert_eq!(radio.session.timer_started_at, radio.clock.now_ms());
    tick(&mut radio);
    assert_eq!(radio.audio.begun.len(), 2);
}

#[test]
fn now_playing_title_shows_when_the_display_settles() {
    let mut radio = playing(seeded_store());
    radio
        .audio
        .metadata
        .push_back(Metadata::title("Tangerine Dream - Love on a Real Train"));
    turn(&mut radio, 1);
    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(
        screen(&radio)[..3],
        ["NOW PLAYING", "Tangerine Dream -", "Love on a Real Train"]
    );

    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert!(radio.display.is_blank());
}

#[test]
fn metadata_signal_gates_the_title() {
    let mut radio = playing(seeded_store());
    radio.input.signals.metadata_enabled = false;
    radio.audio.metadata.push_back(Metadata::title("Hidden"));
    turn(&mut radio, 1);
    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert!(radio.display.is_blank());

    radio.input.signals.title_requested = true;
    tick(&mut radio);
    assert_eq!(screen(&radio)[..2], ["NOW PLAYING", "Hidden"]);
}

#[test]
fn portal_save_copies_the_form_and_waits_for_release() {
    let mut radio = playing(seeded_store());
    radio.input.signals.portal_switch = true;
    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::Up);
    assert_eq!(radio.portal.starts, 1);
    assert_eq!(screen(&radio)[..2], ["PORTAL OPEN", "192.168.1.40/param"]);

    radio.portal.submission = Some("t5=Jazz&u5=http%3A%2F%2Fjazz.example%3A8000%2F".into());
    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::SavePending);
    assert!(radio.stations.get(5).url.is_empty());

    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::Idle);
    assert_eq!(radio.stations.get(5).tag.as_str(), "Jazz");
    assert_eq!(
        radio.store.text(Namespace::Station(5), Field::Url),
        Some("http://jazz.example:8000/")
    );
    assert!(!radio.portal.running);
    assert_eq!(screen(&radio)[0], "SAVED");

    tick(&mut radio);
    assert_eq!(radio.portal.starts, 1, "a held switch does not reopen the portal");

    radio.input.signals.portal_switch = false;
    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::Down);
    radio.input.signals.portal_switch = true;
    tick(&mut radio);
    assert_eq!(radio.portal.starts, 2);
    assert_eq!(radio.form.as_ref().map(|f| f.field(5).tag.as_str()), Some("Jazz"));
}

#[test]
fn releasing_the_portal_switch_closes_it() {
    let mut radio = playing(seeded_store());
    radio.input.signals.portal_switch = true;
    tick(&mut radio);
    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(screen(&radio)[0], "PORTAL OPEN", "the portal message outlives the timeout");

    radio.input.signals.portal_switch = false;
    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::Down);
    assert_eq!(radio.portal.stops, 1);
    assert_eq!(screen(&radio)[0], "PORTAL CLOSED");
}

#[test]
fn ending_an_idle_stream_is_harmless() {
    let mut radio = playing(seeded_store());
    block_on(radio.stop_stream());
    block_on(radio.stop_stream());
    assert_eq!(radio.session.playback, Playback::Idle);
    assert_eq!(radio.audio.ends, 2);
}

#[test]
fn display_timeout_survives_clock_wrap() {
    let mut radio = radio_with(seeded_store());
    radio.clock.set(u32::MAX - 1_000);
    let options = BootOptions {
        play_immediately: true,
        ..BootOptions::default()
    };
    block_on(radio.boot(options)).unwrap();
    tick(&mut radio);
    wait(&mut radio, 2_000);
    assert!(matches!(radio.session.screen, Screen::On { .. }));
    wait(&mut radio, 2_000);
    assert_eq!(radio.session.screen, Screen::Off);
}

#[test]
fn menu_and_timer_setup_never_overlap() {
    let mut radio = playing(seeded_store());
    // deterministic mix of clicks, turns and pauses
    let mut seed: u32 = 0x2545_f491;
    for _ in 0..400 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let outcome = match seed % 7 {
            0 | 1 => click(&mut radio),
            2 => turn(&mut radio, 1),
            3 => turn(&mut radio, -1),
            4 => turn(&mut radio, 30),
            5 => turn(&mut radio, -30),
            _ => wait(&mut radio, 1_000),
        };
        if outcome == TickOutcome::Restart {
            break;
        }
        match radio.session.interaction {
            Interaction::Menu { cursor, .. } => {
                assert!(cursor < STATION_SLOTS);
                assert_ne!(radio.session.volume, 0);
            }
            Interaction::TimerSetup { .. } => assert_ne!(radio.session.volume, 0),
            Interaction::Normal => {}
        }
        assert!(radio.session.current < STATION_SLOTS);
        assert!((0..=100).contains(&radio.input.encoder.position()));
    }
}

#[test]
fn failing_stream_does_not_hold_off_the_zero_volume_power_down() {
    let mut radio = radio_with(seeded_store());
    radio.audio.refused.push(url_of(0));
    let options = BootOptions {
        play_immediately: true,
        ..BootOptions::default()
    };
    assert_eq!(block_on(radio.boot(options)), Ok(()));
    tick(&mut radio);
    assert_eq!(screen(&radio)[..3], ["ERROR", "Missing URL", "Reverting"]);

    turn(&mut radio, 40);
    assert_eq!(radio.session.volume, 0);
    let outcome = (0..3000)
        .map(|_| tick(&mut radio))
        .find(|outcome| *outcome == TickOutcome::Restart);
    assert_eq!(outcome, Some(TickOutcome::Restart));
    assert_eq!(radio.power.calls, ["arm", "suspend", "disarm", "restart"]);
    assert!(radio.audio.begun.len() > 1, "the start was retried meanwhile");
}

#[test]
fn retries_of_a_failing_stream_leave_the_menu_alone() {
    let mut radio = radio_with(seeded_store());
    radio.audio.refused.push(url_of(0));
    let options = BootOptions {
        play_immediately: true,
        ..BootOptions::default()
    };
    assert_eq!(block_on(radio.boot(options)), Ok(()));
    tick(&mut radio);
    wait(&mut radio, 3000);

    click(&mut radio);
    wait(&mut radio, 500);
    assert_eq!(radio.audio.begun, [url_of(0), url_of(0)]);
    assert!(matches!(radio.session.interaction, Interaction::Menu { .. }));
    assert_ne!(screen(&radio)[0], "ERROR");

    wait(&mut radio, DISPLAY_TIMEOUT_MS);
    assert_eq!(radio.session.interaction, Interaction::Normal);
    assert_eq!(radio.input.encoder.position(), 60);
}

#[test]
fn releasing_the_switch_while_a_save_is_pending_commits_and_closes() {
    let mut radio = playing(seeded_store());
    radio.input.signals.portal_switch = true;
    tick(&mut radio);
    radio.portal.submission = Some("t5=Jazz&u5=http%3A%2F%2Fjazz.example%3A8000%2F".into());
    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::SavePending);

    radio.input.signals.portal_switch = false;
    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::Down);
    assert_eq!(radio.stations.get(5).tag.as_str(), "Jazz");
    assert_eq!(
        radio.store.text(Namespace::Station(5), Field::Url),
        Some("http://jazz.example:8000/")
    );
    assert!(!radio.portal.running);
    assert_eq!(screen(&radio)[0], "SAVED");

    tick(&mut radio);
    assert_eq!(radio.session.portal, PortalMode::Down);
    assert_eq!(radio.portal.starts, 1);
}

#[test]
fn muted_volume_is_restored_at_boot_and_stored_once_settled() {
    let mut store = seeded_store();
    store.put_number(Namespace::Settings, Field::Volume, 0);
    let mut radio = playing(store);
    assert_eq!(radio.session.volume, DEFAULT_VOLUME);
    assert_eq!(
        radio.input.encoder.position(),
        crate::input::POSITION_MAX - i32::from(DEFAULT_VOLUME)
    );

    assert_eq!(wait(&mut radio, DISPLAY_TIMEOUT_MS), TickOutcome::Continue);
    assert!(radio.power.calls.is_empty(), "no power-down after a muted shutdown");
    assert_eq!(
        radio.store.number(Namespace::Settings, Field::Volume),
        Some(i32::from(DEFAULT_VOLUME))
    );
}
