use crate::error::{DescriptionSide, EngineStage, NegotiationError, Result};
use crate::logger::dump_candidate;
use crate::peer::connection::ConnectionStateMonitor;
use crate::peer::engine::{EngineEvent, MediaEngine};
use crate::peer::events::EventSink;
use crate::peer::ice::{report_candidates, CandidateStats};
use crate::peer::state::{Ack, NegotiationState};
use crate::peer::types::{
    ConnectivityState, GatheringState, IceCandidate, MediaTrack, SessionDescription, SessionRole,
};
use tracing::{debug, info, trace, warn};

/// Машина состояний offer/answer для одной сессии.
///
/// Все методы вызываются из одного сериализованного контекста (см.
/// [`crate::session`]), поэтому состояние не защищено блокировками.
pub struct SessionNegotiator<E, S> {
    id: String,
    engine: E,
    sink: S,
    state: NegotiationState,
    monitor: ConnectionStateMonitor,
    local_candidates: CandidateStats,
    alive: bool,
}

impl<E, S> SessionNegotiator<E, S>
where
    E: MediaEngine,
    S: EventSink,
{
    /// Добавляет треки по одному на каждый вид медиа
    pub fn new(id: impl Into<String>, engine: E, sink: S, tracks: Vec<MediaTrack>) -> Self {
        let id = id.into();
        for track in tracks {
            debug!(session = %id, kind = %track.kind, track = %track.id, "adding track");
            engine.add_track(track);
        }
        Self {
            id,
            engine,
            sink,
            state: NegotiationState::new(),
            monitor: ConnectionStateMonitor::new(),
            local_candidates: CandidateStats::default(),
            alive: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> SessionRole {
        self.state.role()
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn create_offer(&mut self) -> Result<()> {
        self.ensure_alive()?;
        if self.state.assign_role(SessionRole::Initiator, "create an offer")? {
            info!(session = %self.id, role = %SessionRole::Initiator, "role assigned");
        }
        self.state.request_local()?;
        debug!(session = %self.id, "creating offer");
        self.engine.create_offer();
        Ok(())
    }

    pub fn create_answer(&mut self) -> Result<()> {
        self.ensure_alive()?;
        if self.state.assign_role(SessionRole::Responder, "create an answer")? {
            info!(session = %self.id, role = %SessionRole::Responder, "role assigned");
        }
        self.state.request_local()?;
        debug!(session = %self.id, "creating answer");
        self.engine.create_answer();
        Ok(())
    }

    pub fn set_remote_description(&mut self, desc: SessionDescription) -> Result<()> {
        self.ensure_alive()?;
        self.state.submit_remote(desc.clone())?;
        debug!(session = %self.id, sdp_type = %desc.sdp_type, "setting remote description");
        self.engine.set_remote_description(desc);
        Ok(())
    }

    /// Кандидат удалённой стороны: в очередь, пока удалённое описание не
    /// применено, иначе сразу в движок
    pub fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        self.ensure_alive()?;
        dump_candidate("REMOTE", &candidate);
        match self.state.enqueue_remote_candidate(candidate) {
            Ok(()) => {
                debug!(
                    session = %self.id,
                    queued = self.state.queue().len(),
                    "remote description not applied yet, queuing candidate"
                );
            }
            Err(candidate) => self.engine.add_ice_candidate(candidate),
        }
        Ok(())
    }

    /// Единая точка входа для колбэков движка
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if !self.alive {
            trace!(session = %self.id, ?event, "discarding engine callback after teardown");
            return;
        }

        match event {
            EngineEvent::DescriptionCreated(desc) => self.on_local_description_created(desc),
            EngineEvent::LocalDescriptionApplied => self.on_local_description_applied(),
            EngineEvent::RemoteDescriptionApplied => self.on_remote_description_applied(),
            EngineEvent::CandidateDiscovered(candidate) => {
                self.local_candidates.record(&candidate);
                self.sink.on_ice_candidate(&candidate);
            }
            EngineEvent::IceConnectionStateChanged(raw) => {
                debug!(session = %self.id, %raw, "ice connection state changed");
                self.monitor.dispatch(raw, &self.sink);
            }
            EngineEvent::GatheringStateChanged(state) => {
                debug!(session = %self.id, ?state, "ice gathering state changed");
                if state == GatheringState::Complete {
                    report_candidates(&self.local_candidates);
                }
            }
            EngineEvent::Failed { stage, reason } => self.on_engine_failure(stage, reason),
        }
    }

    /// Разрушает сессию; поздние колбэки движка будут проигнорированы
    pub fn close(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        info!(session = %self.id, role = %self.state.role(), "closing session");
        self.engine.close();
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.alive {
            Ok(())
        } else {
            Err(NegotiationError::SessionClosed(self.id.clone()))
        }
    }

    fn on_local_description_created(&mut self, desc: SessionDescription) {
        if let Err(e) = self.state.local_created(desc.clone()) {
            warn!(session = %self.id, error = %e, "unexpected local description from engine");
            return;
        }
        debug!(session = %self.id, sdp_type = %desc.sdp_type, "setting local description");
        self.engine.set_local_description(desc);
    }

    fn on_local_description_applied(&mut self) {
        let local = match self.state.local_applied() {
            Ack::Applied(desc) => desc,
            Ack::Duplicate => {
                debug!(session = %self.id, "duplicate local description ack");
                return;
            }
            Ack::Unexpected => {
                warn!(session = %self.id, "local description ack without pending description");
                return;
            }
        };

        match self.state.role() {
            SessionRole::Initiator => {
                if self.state.remote_description_set() {
                    // Ответ пришёл раньше, чем применился наш offer
                    debug!(session = %self.id, "remote description already applied");
                    self.drain_remote_candidates();
                } else {
                    info!(session = %self.id, "local offer ready");
                    self.sink.on_local_description(&local);
                }
            }
            SessionRole::Responder => {
                info!(session = %self.id, "local answer ready");
                self.sink.on_local_description(&local);
                self.drain_remote_candidates();
            }
            SessionRole::Unassigned => {
                warn!(session = %self.id, "local description applied without a role");
            }
        }
    }

    fn on_remote_description_applied(&mut self) {
        match self.state.remote_applied() {
            Ack::Applied(desc) => {
                info!(session = %self.id, sdp_type = %desc.sdp_type, "remote description applied");
            }
            Ack::Duplicate => debug!(session = %self.id, "duplicate remote description ack"),
            Ack::Unexpected => {
                warn!(session = %self.id, "remote description ack without pending description");
                return;
            }
        }

        if self.state.role() == SessionRole::Initiator || self.state.local_description_set() {
            self.drain_remote_candidates();
        }
    }

    fn drain_remote_candidates(&mut self) {
        let engine = &self.engine;
        match self.state.drain_candidates(|candidate| engine.add_ice_candidate(candidate)) {
            Some(0) => trace!(session = %self.id, "candidate queue empty or already drained"),
            Some(count) => debug!(session = %self.id, count, "applied pending remote candidates"),
            None => debug!(session = %self.id, "remote description not applied, keeping candidates"),
        }
    }

    fn on_engine_failure(&mut self, stage: EngineStage, reason: String) {
        let side = match stage {
            EngineStage::CreateOffer | EngineStage::CreateAnswer | EngineStage::SetLocalDescription => {
                DescriptionSide::Local
            }
            EngineStage::SetRemoteDescription => DescriptionSide::Remote,
            EngineStage::AddIceCandidate => {
                warn!(session = %self.id, %reason, "failed to add remote candidate");
                return;
            }
        };

        self.state.reset(side);
        let error = NegotiationError::EngineRejection { stage, reason };
        warn!(session = %self.id, error = %error, "negotiation attempt failed");
        self.sink.on_negotiation_failed(&error);
    }
}
