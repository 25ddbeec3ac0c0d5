//! Host fakes for the collaborator traits.
use core::cell::Cell;
use core::net::Ipv4Addr;
use std::collections::{BTreeMap, VecDeque};
use std::string::String as StdString;
use std::vec::Vec as StdVec;

use heapless::String;

use crate::audio::{AudioPipeline, Metadata};
use crate::clock::Clock;
use crate::display::TextGrid;
use crate::encoder::EncoderCounter;
use crate::input::{InputDevice, LiveSignals, POSITION_MAX, POSITION_MIN};
use crate::network::{Network, WifiCredentials};
use crate::portal::{StationForm, WebPortal};
use crate::power::PowerControl;
use crate::radio::Platform;
use crate::storage::{Field, KeyValueStore, MAX_VALUE_LEN, Namespace, StorageError, bounded, storage_key};

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    /// Integer item.
    Int(i32),
    /// String item.
    Text(StdString),
}

/// Key/value store in a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Items by flat key.
    values: BTreeMap<u16, Value>,
    /// Successful writes.
    pub writes: usize,
}

impl MemoryStore {
    /// Sets a string without going through the async API.
    pub fn put_text(&mut self, namespace: Namespace, field: Field, text: &str) {
        self.values
            .insert(storage_key(namespace, field), Value::Text(text.into()));
    }

    /// Sets an integer without going through the async API.
    pub fn put_number(&mut self, namespace: Namespace, field: Field, value: i32) {
        self.values
            .insert(storage_key(namespace, field), Value::Int(value));
    }

    /// The integer under a key.
    pub fn number(&self, namespace: Namespace, field: Field) -> Option<i32> {
        match self.values.get(&storage_key(namespace, field)) {
            Some(Value::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// The string under a key.
    pub fn text(&self, namespace: Namespace, field: Field) -> Option<&str> {
        match self.values.get(&storage_key(namespace, field)) {
            Some(Value::Text(text)) => Some(text),
            _ => None,
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn get_int(&mut self, namespace: Namespace, field: Field) -> Result<Option<i32>, StorageError> {
        match self.values.get(&storage_key(namespace, field)) {
            None => Ok(None),
            Some(Value::Int(value)) => Ok(Some(*value)),
            Some(Value::Text(_)) => Err(StorageError::Corrupted),
        }
    }

    async fn put_int(&mut self, namespace: Namespace, field: Field, value: i32) -> Result<(), StorageError> {
        self.writes += 1;
        self.put_number(namespace, field, value);
        Ok(())
    }

    async fn get_string(
        &mut self,
        namespace: Namespace,
        field: Field,
    ) -> Result<Option<String<MAX_VALUE_LEN>>, StorageError> {
        match self.values.get(&storage_key(namespace, field)) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(bounded(text))),
            Some(Value::Int(_)) => Err(StorageError::Corrupted),
        }
    }

    async fn put_string(&mut self, namespace: Namespace, field: Field, value: &str) -> Result<(), StorageError> {
        self.writes += 1;
        self.put_text(namespace, field, value);
        Ok(())
    }

    async fn has_key(&mut self, namespace: Namespace, field: Field) -> Result<bool, StorageError> {
        Ok(self.values.contains_key(&storage_key(namespace, field)))
    }

    async fn erase_all(&mut self) -> Result<(), StorageError> {
        self.values.clear();
        Ok(())
    }
}

/// Input driven by the real encoder counter plus settable signals.
pub struct ScriptedInput {
    /// The counter an edge handler would drive.
    pub encoder: EncoderCounter,
    /// Levels returned by the next sample. `toggle_pressed` is cleared once sampled.
    pub signals: LiveSignals,
}

impl Default for ScriptedInput {
    fn default() -> Self {
        Self {
            encoder: EncoderCounter::new(POSITION_MIN, POSITION_MAX),
            signals: LiveSignals {
                metadata_enabled: true,
                ..LiveSignals::default()
            },
        }
    }
}

impl InputDevice for ScriptedInput {
    fn poll_button_clicked(&mut self) -> bool {
        self.encoder.take_clicked()
    }

    fn poll_rotation_changed(&mut self) -> bool {
        self.encoder.take_changed()
    }

    fn read_position(&mut self) -> i32 {
        self.encoder.position()
    }

    fn set_position(&mut self, position: i32) {
        self.encoder.set_position(position);
    }

    fn recenter(&mut self, center: i32) -> i32 {
        self.encoder.recenter(center)
    }

    fn sample_signals(&mut self) -> LiveSignals {
        let signals = self.signals;
        self.signals.toggle_pressed = false;
        signals
    }
}

/// Audio pipeline that records what it was asked to do.
#[derive(Default)]
pub struct RecordingAudio {
    /// URLs `begin` refuses.
    pub refused: StdVec<StdString>,
    /// Every URL passed to `begin`, in order.
    pub begun: StdVec<StdString>,
    /// Calls to `end`.
    pub ends: usize,
    /// A stream is open.
    pub playing: bool,
    /// Calls to `pump` while playing.
    pub pumps: usize,
    /// Last gain set.
    pub gain: f32,
    /// Events handed out by `poll_metadata`.
    pub metadata: VecDeque<Metadata>,
}

impl AudioPipeline for RecordingAudio {
    async fn begin(&mut self, url: &str) -> bool {
        self.begun.push(url.into());
        self.playing = !self.refused.iter().any(|refused| refused == url);
        self.playing
    }

    async fn end(&mut self) {
        self.ends += 1;
        self.playing = false;
    }

    async fn pump(&mut self) -> bool {
        if self.playing {
            self.pumps += 1;
        }
        self.playing
    }

    fn set_volume(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn poll_metadata(&mut self) -> Option<Metadata> {
        self.metadata.pop_front()
    }
}

/// Network with scripted outcomes.
pub struct FakeNetwork {
    /// Whether `try_connect` succeeds.
    pub joins: bool,
    /// Credentials passed to `try_connect`.
    pub attempts: StdVec<WifiCredentials>,
    /// What the captive portal returns.
    pub portal_result: Option<WifiCredentials>,
    /// Timeouts the captive portal was opened with.
    pub portal_timeouts: StdVec<Option<u32>>,
    /// Reported signal strength.
    pub rssi: i32,
    /// Reported address.
    pub ip: Option<Ipv4Addr>,
    /// `disable_radio` was called.
    pub radio_off: bool,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self {
            joins: true,
            attempts: StdVec::new(),
            portal_result: None,
            portal_timeouts: StdVec::new(),
            rssi: -60,
            ip: Some(Ipv4Addr::new(192, 168, 1, 40)),
            radio_off: false,
        }
    }
}

impl Network for FakeNetwork {
    async fn try_connect(&mut self, credentials: &WifiCredentials) -> bool {
        self.attempts.push(credentials.clone());
        self.joins
    }

    async fn start_captive_portal(&mut self, _name: &str, timeout_ms: Option<u32>) -> Option<WifiCredentials> {
        self.portal_timeouts.push(timeout_ms);
        self.portal_result.clone()
    }

    fn signal_strength(&mut self) -> i32 {
        self.rssi
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    async fn disable_radio(&mut self) {
        self.radio_off = true;
    }
}

/// Web portal whose next `process` can deliver a submitted form body.
#[derive(Default)]
pub struct FakePortal {
    /// The server runs.
    pub running: bool,
    /// Calls to `start`.
    pub starts: usize,
    /// Calls to `stop`.
    pub stops: usize,
    /// Urlencoded body delivered by the next `process` while running.
    pub submission: Option<StdString>,
}

impl WebPortal for FakePortal {
    async fn start(&mut self, _form: &StationForm) {
        self.running = true;
        self.starts += 1;
    }

    async fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }

    async fn process(&mut self, form: &mut StationForm) -> bool {
        if !self.running {
            return false;
        }
        match self.submission.take() {
            Some(body) => {
                form.apply_urlencoded(&body);
                true
            }
            None => false,
        }
    }
}

/// Power control that records the power-down sequence.
#[derive(Default)]
pub struct RecordingPower {
    /// Steps in call order.
    pub calls: StdVec<&'static str>,
}

impl PowerControl for RecordingPower {
    fn arm_button_wake(&mut self) {
        self.calls.push("arm");
    }

    async fn suspend(&mut self) {
        self.calls.push("suspend");
    }

    fn disable_wake_sources(&mut self) {
        self.calls.push("disarm");
    }

    async fn restart(&mut self) {
        self.calls.push("restart");
    }
}

/// Clock moved by hand. `delay_ms` advances it.
#[derive(Default)]
pub struct ManualClock {
    /// Current time.
    now: Cell<u32>,
}

impl ManualClock {
    /// Moves time forward.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Sets the time.
    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }

    async fn delay_ms(&self, ms: u32) {
        self.advance(ms);
    }
}

/// The host platform made of the fakes above.
pub struct HostPlatform;

impl Platform for HostPlatform {
    type Store = MemoryStore;
    type Input = ScriptedInput;
    type Display = TextGrid;
    type Audio = RecordingAudio;
    type Net = FakeNetwork;
    type Portal = FakePortal;
    type Power = RecordingPower;
    type Clock = ManualClock;
}
