//! Screens that need session state.
use super::{Interaction, Platform, Radio};
use crate::clock::Clock;
use crate::display::screens::{self, StatusView};
use crate::network::Network;
use crate::timer::time_left_text;

impl<P: Platform> Radio<P> {
    /// Station, timer, signal and volume.
    pub(super) fn show_status(&mut self) {
        let now = self.clock.now_ms();
        let timer = self.session.timer;
        let time_left = timer
            .enabled
            .then(|| time_left_text(timer.duration, now, self.session.timer_started_at));
        let view = StatusView {
            tag: &self.stations.get(self.session.current).tag,
            time_left: time_left.as_deref(),
            rssi: self.net.signal_strength(),
            volume: self.session.volume,
        };
        screens::status(&mut self.display, &view);
    }

    /// The station menu, when it is open.
    pub(super) fn show_menu(&mut self) {
        if let Interaction::Menu { cursor, toggle, .. } = self.session.interaction {
            screens::menu(&mut self.display, &self.stations, self.session.current, cursor, toggle);
        }
    }
}
