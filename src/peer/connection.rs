use crate::peer::events::EventSink;
use crate::peer::types::{ConnectivityState, RawIceState};
use tracing::{debug, info, warn};

/// Сводит сырые состояния ICE к connected / disconnected / failed.
///
/// Уведомление отправляется один раз на переход; `Failed` терминально,
/// восстановление через ICE restart здесь не выполняется.
#[derive(Debug, Default)]
pub struct ConnectionStateMonitor {
    state: ConnectivityState,
}

impl ConnectionStateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Возвращает новое состояние, если переход должен быть виден клиенту
    pub fn on_raw_state(&mut self, raw: RawIceState) -> Option<ConnectivityState> {
        if self.state == ConnectivityState::Failed {
            debug!(%raw, "ice state after failure - ignoring");
            return None;
        }

        let next = match raw {
            RawIceState::Connected => ConnectivityState::Connected,
            RawIceState::Disconnected => ConnectivityState::Disconnected,
            RawIceState::Failed => ConnectivityState::Failed,
            RawIceState::New
            | RawIceState::Checking
            | RawIceState::Completed
            | RawIceState::Closed => {
                debug!(%raw, "ice state - ignoring");
                return None;
            }
        };

        if next == self.state {
            debug!(%raw, "ice state unchanged");
            return None;
        }

        self.state = next;
        Some(next)
    }

    /// Переводит сырое состояние и уведомляет sink
    pub fn dispatch<S: EventSink + ?Sized>(&mut self, raw: RawIceState, sink: &S) {
        match self.on_raw_state(raw) {
            Some(ConnectivityState::Connected) => {
                info!("ice connected");
                sink.on_ice_connected();
            }
            Some(ConnectivityState::Disconnected) => {
                warn!("ice disconnected");
                sink.on_ice_disconnected();
            }
            Some(ConnectivityState::Failed) => {
                warn!("ice failed");
                sink.on_ice_failed();
            }
            Some(ConnectivityState::New) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::events::testing::{Recorded, RecordingSink};

    #[test]
    fn only_three_raw_states_are_observable() {
        let sink = RecordingSink::default();
        let mut monitor = ConnectionStateMonitor::new();

        monitor.dispatch(RawIceState::New, &sink);
        monitor.dispatch(RawIceState::Checking, &sink);
        assert!(sink.take().is_empty());

        monitor.dispatch(RawIceState::Connected, &sink);
        monitor.dispatch(RawIceState::Completed, &sink);
        monitor.dispatch(RawIceState::Disconnected, &sink);
        monitor.dispatch(RawIceState::Connected, &sink);
        monitor.dispatch(RawIceState::Failed, &sink);

        assert_eq!(
            sink.take(),
            vec![
                Recorded::Connected,
                Recorded::Disconnected,
                Recorded::Connected,
                Recorded::Failed,
            ]
        );
        assert_eq!(monitor.state(), ConnectivityState::Failed);
    }

    #[test]
    fn repeated_raw_state_emits_once() {
        let mut monitor = ConnectionStateMonitor::new();
        assert_eq!(
            monitor.on_raw_state(RawIceState::Connected),
            Some(ConnectivityState::Connected)
        );
        assert_eq!(monitor.on_raw_state(RawIceState::Connected), None);
    }

    #[test]
    fn failed_is_terminal() {
        let mut monitor = ConnectionStateMonitor::new();
        monitor.on_raw_state(RawIceState::Failed);
        assert_eq!(monitor.on_raw_state(RawIceState::Connected), None);
        assert_eq!(monitor.on_raw_state(RawIceState::Disconnected), None);
        assert_eq!(monitor.state(), ConnectivityState::Failed);
    }

    #[test]
    fn closed_is_absorbed() {
        let sink = RecordingSink::default();
        let mut monitor = ConnectionStateMonitor::new();
        monitor.dispatch(RawIceState::Connected, &sink);
        monitor.dispatch(RawIceState::Closed, &sink);
        assert_eq!(sink.take(), vec![Recorded::Connected]);
        assert_eq!(monitor.state(), ConnectivityState::Connected);
    }
}
