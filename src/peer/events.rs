use crate::error::NegotiationError;
use crate::logger::dump_candidate;
use crate::peer::types::{IceCandidate, SessionDescription};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Уведомления приложению.
///
/// Вызываются из контекста сессии; реализация не должна синхронно
/// вызывать обратно методы переговорщика.
pub trait EventSink: Send {
    /// Локальное описание применено и готово к отправке удалённой стороне
    fn on_local_description(&self, desc: &SessionDescription);

    /// Найден локальный кандидат (исходящий поток, к очереди не относится)
    fn on_ice_candidate(&self, candidate: &IceCandidate);

    fn on_ice_connected(&self);

    fn on_ice_disconnected(&self);

    fn on_ice_failed(&self);

    /// Движок отклонил создание или применение описания
    fn on_negotiation_failed(&self, _error: &NegotiationError) {}
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_local_description(&self, desc: &SessionDescription) {
        (**self).on_local_description(desc)
    }

    fn on_ice_candidate(&self, candidate: &IceCandidate) {
        (**self).on_ice_candidate(candidate)
    }

    fn on_ice_connected(&self) {
        (**self).on_ice_connected()
    }

    fn on_ice_disconnected(&self) {
        (**self).on_ice_disconnected()
    }

    fn on_ice_failed(&self) {
        (**self).on_ice_failed()
    }

    fn on_negotiation_failed(&self, error: &NegotiationError) {
        (**self).on_negotiation_failed(error)
    }
}

/// Событие сессии в виде значения, удобном для пересылки в UI или по сети
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionNotification {
    LocalDescription { session: String, description: SessionDescription },
    IceCandidate { session: String, candidate: IceCandidate },
    Connected { session: String },
    Disconnected { session: String },
    Failed { session: String },
    NegotiationFailed { session: String, reason: String },
}

/// Sink, превращающий вызовы в поток `SessionNotification`
#[derive(Debug, Clone)]
pub struct ChannelSink {
    session: String,
    tx: mpsc::UnboundedSender<SessionNotification>,
}

impl ChannelSink {
    pub fn new(session: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<SessionNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                session: session.into(),
                tx,
            },
            rx,
        )
    }

    fn emit(&self, notification: SessionNotification) {
        debug!(session = %self.session, ?notification, "emit");
        if self.tx.send(notification).is_err() {
            trace!(session = %self.session, "notification receiver dropped");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_local_description(&self, desc: &SessionDescription) {
        self.emit(SessionNotification::LocalDescription {
            session: self.session.clone(),
            description: desc.clone(),
        });
    }

    fn on_ice_candidate(&self, candidate: &IceCandidate) {
        dump_candidate("LOCAL", candidate);
        self.emit(SessionNotification::IceCandidate {
            session: self.session.clone(),
            candidate: candidate.clone(),
        });
    }

    fn on_ice_connected(&self) {
        self.emit(SessionNotification::Connected {
            session: self.session.clone(),
        });
    }

    fn on_ice_disconnected(&self) {
        self.emit(SessionNotification::Disconnected {
            session: self.session.clone(),
        });
    }

    fn on_ice_failed(&self) {
        self.emit(SessionNotification::Failed {
            session: self.session.clone(),
        });
    }

    fn on_negotiation_failed(&self, error: &NegotiationError) {
        self.emit(SessionNotification::NegotiationFailed {
            session: self.session.clone(),
            reason: error.to_string(),
        });
    }
}
