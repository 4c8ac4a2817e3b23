#![allow(dead_code)]

use rtc_negotiator::peer::engine::{EngineEventRx, EngineEventTx};
use rtc_negotiator::{
    EngineEvent, IceCandidate, MediaEngine, MediaTrack, SessionDescription, SessionNotification,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(IceCandidate),
    AddTrack(MediaTrack),
    Close,
}

/// Движок, который сразу подтверждает каждую операцию событием
#[derive(Clone)]
pub struct ScriptedEngine {
    label: &'static str,
    events: EngineEventTx,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedEngine {
    pub fn new(label: &'static str) -> (Self, EngineEventRx) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                label,
                events,
                calls: Arc::new(Mutex::new(Vec::new())),
            },
            rx,
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Событие "от движка"; после закрытия сессии отправка молча не удаётся
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MediaEngine for ScriptedEngine {
    fn create_offer(&self) {
        self.record(Call::CreateOffer);
        self.emit(EngineEvent::DescriptionCreated(SessionDescription::offer(format!(
            "v=0 offer from {}",
            self.label
        ))));
    }

    fn create_answer(&self) {
        self.record(Call::CreateAnswer);
        self.emit(EngineEvent::DescriptionCreated(SessionDescription::answer(format!(
            "v=0 answer from {}",
            self.label
        ))));
    }

    fn set_local_description(&self, desc: SessionDescription) {
        self.record(Call::SetLocal(desc));
        self.emit(EngineEvent::LocalDescriptionApplied);
    }

    fn set_remote_description(&self, desc: SessionDescription) {
        self.record(Call::SetRemote(desc));
        self.emit(EngineEvent::RemoteDescriptionApplied);
    }

    fn add_ice_candidate(&self, candidate: IceCandidate) {
        self.record(Call::AddCandidate(candidate));
    }

    fn add_track(&self, track: MediaTrack) {
        self.record(Call::AddTrack(track));
    }

    fn close(&self) {
        self.record(Call::Close);
    }
}

pub fn cand(n: u16) -> IceCandidate {
    IceCandidate::new(
        format!("candidate:{n} 1 udp 2130706431 10.1.0.{n} 4000{n} typ host"),
        Some("0".into()),
        Some(0),
    )
}

pub async fn next_notification(
    rx: &mut mpsc::UnboundedReceiver<SessionNotification>,
) -> SessionNotification {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("notification channel closed")
}

pub async fn next_local_description(
    rx: &mut mpsc::UnboundedReceiver<SessionNotification>,
) -> SessionDescription {
    loop {
        if let SessionNotification::LocalDescription { description, .. } = next_notification(rx).await {
            return description;
        }
    }
}

/// Ждёт выполнения условия, опрашивая его
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    wait(async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

pub async fn wait<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}
