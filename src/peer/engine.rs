use crate::config::{ClientConfig, ServerConfig};
use crate::error::{EngineStage, NegotiationError, Result};
use crate::peer::events::EventSink;
use crate::peer::types::{
    GatheringState, IceCandidate, MediaKind, MediaTrack, RawIceState, SdpType, SessionDescription,
    MEDIA_STREAM_ID,
};
use crate::session::Session;
use crate::utils::{add_ice_url_scheme, random_id};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine as RtcMediaEngine, MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// Вызовы, которые переговорщик делает в медиа-движок.
///
/// Все методы "выстрелил и забыл": результат приходит позже как
/// [`EngineEvent`] в контекст сессии.
pub trait MediaEngine: Send {
    fn create_offer(&self);
    fn create_answer(&self);
    fn set_local_description(&self, desc: SessionDescription);
    fn set_remote_description(&self, desc: SessionDescription);
    fn add_ice_candidate(&self, candidate: IceCandidate);
    fn add_track(&self, track: MediaTrack);
    fn close(&self);
}

/// Колбэки движка, которые нужны переговорщику
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    DescriptionCreated(SessionDescription),
    LocalDescriptionApplied,
    RemoteDescriptionApplied,
    CandidateDiscovered(IceCandidate),
    IceConnectionStateChanged(RawIceState),
    GatheringStateChanged(GatheringState),
    Failed { stage: EngineStage, reason: String },
}

pub type EngineEventTx = mpsc::UnboundedSender<EngineEvent>;
pub type EngineEventRx = mpsc::UnboundedReceiver<EngineEvent>;

/// Разделяемая фабрика движков: кодеки и интерсепторы регистрируются один раз
pub struct EngineFactory {
    api: API,
    config: ClientConfig,
}

impl EngineFactory {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut media = RtcMediaEngine::default();
        media.register_default_codecs().map_err(to_setup_error)?;
        let registry = register_default_interceptors(Registry::new(), &mut media).map_err(to_setup_error)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        info!(ice_servers = config.ice_servers.len(), "engine factory ready");
        Ok(Self { api, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Создаём peer connection; события движка уходят в `events`
    pub async fn new_engine(&self, events: EngineEventTx) -> Result<WebRtcEngine> {
        let pc = Arc::new(
            self.api
                .new_peer_connection(rtc_config(&self.config))
                .await
                .map_err(to_setup_error)?,
        );
        Ok(WebRtcEngine::attach(pc, events))
    }

    /// Полная сессия: движок, треки из конфигурации и сериализованный контекст
    pub async fn create_session<S>(&self, sink: S) -> Result<Session>
    where
        S: EventSink + 'static,
    {
        let id = random_id();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let engine = self.new_engine(events_tx).await?;
        Ok(Session::spawn(id, engine, sink, events_rx, self.config.tracks()))
    }
}

/// Создает конфигурацию для peer connection
fn rtc_config(config: &ClientConfig) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: ice_servers(&config.ice_servers),
        ice_candidate_pool_size: config.ice_candidate_pool_size,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

fn ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|server| RTCIceServer {
            urls: vec![add_ice_url_scheme(server)],
            username: server.username.clone().unwrap_or_default(),
            credential: server.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
        .collect()
}

fn to_setup_error(err: webrtc::Error) -> NegotiationError {
    NegotiationError::Setup(err.to_string())
}

enum EngineOp {
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(IceCandidate),
    AddTrack(MediaTrack),
    Close,
}

/// Адаптер над `RTCPeerConnection`.
///
/// Операции выполняются по одной в отдельной задаче, поэтому движок видит
/// их в порядке вызова (слитые кандидаты приходят FIFO).
pub struct WebRtcEngine {
    ops: mpsc::UnboundedSender<EngineOp>,
}

impl WebRtcEngine {
    pub fn attach(pc: Arc<RTCPeerConnection>, events: EngineEventTx) -> Self {
        install_callbacks(&pc, &events);

        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_ops(pc, ops_rx, events));
        Self { ops: ops_tx }
    }

    fn submit(&self, op: EngineOp) {
        if self.ops.send(op).is_err() {
            trace!("engine worker stopped - dropping operation");
        }
    }
}

impl MediaEngine for WebRtcEngine {
    fn create_offer(&self) {
        self.submit(EngineOp::CreateOffer);
    }

    fn create_answer(&self) {
        self.submit(EngineOp::CreateAnswer);
    }

    fn set_local_description(&self, desc: SessionDescription) {
        self.submit(EngineOp::SetLocal(desc));
    }

    fn set_remote_description(&self, desc: SessionDescription) {
        self.submit(EngineOp::SetRemote(desc));
    }

    fn add_ice_candidate(&self, candidate: IceCandidate) {
        self.submit(EngineOp::AddCandidate(candidate));
    }

    fn add_track(&self, track: MediaTrack) {
        self.submit(EngineOp::AddTrack(track));
    }

    fn close(&self) {
        self.submit(EngineOp::Close);
    }
}

fn send_event(events: &EngineEventTx, event: EngineEvent) {
    if events.send(event).is_err() {
        trace!("session gone - dropping engine event");
    }
}

fn install_callbacks(pc: &RTCPeerConnection, events: &EngineEventTx) {
    let tx = events.clone();
    pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
        match cand {
            Some(c) => match c.to_json() {
                Ok(init) => send_event(
                    &tx,
                    EngineEvent::CandidateDiscovered(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                    }),
                ),
                Err(e) => warn!(error = %e, "failed to serialize local candidate"),
            },
            // cand == None означает конец сбора
            None => debug!("ice candidate gathering finished (null candidate)"),
        }
        Box::pin(async {})
    }));

    let tx = events.clone();
    pc.on_ice_connection_state_change(Box::new(move |st: RTCIceConnectionState| {
        debug!(state = %st, "ice connection state changed");
        send_event(&tx, EngineEvent::IceConnectionStateChanged(raw_ice_state(st)));
        Box::pin(async {})
    }));

    let tx = events.clone();
    pc.on_ice_gathering_state_change(Box::new(move |st: RTCIceGathererState| {
        if let Some(state) = gathering_state(st) {
            send_event(&tx, EngineEvent::GatheringStateChanged(state));
        }
        Box::pin(async {})
    }));
}

async fn run_ops(
    pc: Arc<RTCPeerConnection>,
    mut ops: mpsc::UnboundedReceiver<EngineOp>,
    events: EngineEventTx,
) {
    while let Some(op) = ops.recv().await {
        match op {
            EngineOp::CreateOffer => {
                let event = match pc.create_offer(None).await {
                    Ok(desc) => created(desc, EngineStage::CreateOffer),
                    Err(e) => failed(EngineStage::CreateOffer, e),
                };
                send_event(&events, event);
            }
            EngineOp::CreateAnswer => {
                let event = match pc.create_answer(None).await {
                    Ok(desc) => created(desc, EngineStage::CreateAnswer),
                    Err(e) => failed(EngineStage::CreateAnswer, e),
                };
                send_event(&events, event);
            }
            EngineOp::SetLocal(desc) => {
                let result = match to_rtc_description(&desc) {
                    Ok(rtc) => pc.set_local_description(rtc).await,
                    Err(e) => Err(e),
                };
                let event = match result {
                    Ok(()) => EngineEvent::LocalDescriptionApplied,
                    Err(e) => failed(EngineStage::SetLocalDescription, e),
                };
                send_event(&events, event);
            }
            EngineOp::SetRemote(desc) => {
                let result = match to_rtc_description(&desc) {
                    Ok(rtc) => pc.set_remote_description(rtc).await,
                    Err(e) => Err(e),
                };
                let event = match result {
                    Ok(()) => EngineEvent::RemoteDescriptionApplied,
                    Err(e) => failed(EngineStage::SetRemoteDescription, e),
                };
                send_event(&events, event);
            }
            EngineOp::AddCandidate(candidate) => {
                let init = RTCIceCandidateInit {
                    candidate: candidate.candidate,
                    sdp_mid: candidate.sdp_mid,
                    sdp_mline_index: candidate.sdp_mline_index,
                    username_fragment: None,
                };
                if let Err(e) = pc.add_ice_candidate(init).await {
                    send_event(&events, failed(EngineStage::AddIceCandidate, e));
                }
            }
            EngineOp::AddTrack(track) => {
                if let Err(e) = pc.add_track(local_track(&track)).await {
                    warn!(kind = %track.kind, id = %track.id, error = %e, "failed to add track");
                }
            }
            EngineOp::Close => {
                if let Err(e) = pc.close().await {
                    warn!(error = %e, "failed to close peer connection");
                }
                break;
            }
        }
    }
    debug!("engine worker stopped");
}

fn created(desc: RTCSessionDescription, stage: EngineStage) -> EngineEvent {
    match from_rtc_description(desc) {
        Ok(desc) => EngineEvent::DescriptionCreated(desc),
        Err(reason) => EngineEvent::Failed { stage, reason },
    }
}

fn failed(stage: EngineStage, err: webrtc::Error) -> EngineEvent {
    EngineEvent::Failed {
        stage,
        reason: err.to_string(),
    }
}

fn local_track(track: &MediaTrack) -> Arc<dyn TrackLocal + Send + Sync> {
    let codec = match track.kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    };
    Arc::new(TrackLocalStaticSample::new(
        codec,
        track.id.clone(),
        MEDIA_STREAM_ID.to_owned(),
    ))
}

fn to_rtc_description(desc: &SessionDescription) -> std::result::Result<RTCSessionDescription, webrtc::Error> {
    match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp.clone()),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp.clone()),
    }
}

fn from_rtc_description(desc: RTCSessionDescription) -> std::result::Result<SessionDescription, String> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        other => return Err(format!("unsupported sdp type {other}")),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

fn raw_ice_state(st: RTCIceConnectionState) -> RawIceState {
    match st {
        RTCIceConnectionState::Unspecified | RTCIceConnectionState::New => RawIceState::New,
        RTCIceConnectionState::Checking => RawIceState::Checking,
        RTCIceConnectionState::Connected => RawIceState::Connected,
        RTCIceConnectionState::Completed => RawIceState::Completed,
        RTCIceConnectionState::Disconnected => RawIceState::Disconnected,
        RTCIceConnectionState::Failed => RawIceState::Failed,
        RTCIceConnectionState::Closed => RawIceState::Closed,
    }
}

fn gathering_state(st: RTCIceGathererState) -> Option<GatheringState> {
    match st {
        RTCIceGathererState::New => Some(GatheringState::New),
        RTCIceGathererState::Gathering => Some(GatheringState::Gathering),
        RTCIceGathererState::Complete => Some(GatheringState::Complete),
        RTCIceGathererState::Unspecified | RTCIceGathererState::Closed => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum EngineCall {
        CreateOffer,
        CreateAnswer,
        SetLocal(SessionDescription),
        SetRemote(SessionDescription),
        AddCandidate(IceCandidate),
        AddTrack(MediaTrack),
        Close,
    }

    /// Движок, который только записывает вызовы
    #[derive(Debug, Clone, Default)]
    pub struct MockEngine {
        calls: Arc<Mutex<Vec<EngineCall>>>,
    }

    impl MockEngine {
        pub fn take(&self) -> Vec<EngineCall> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }

        fn push(&self, call: EngineCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl MediaEngine for MockEngine {
        fn create_offer(&self) {
            self.push(EngineCall::CreateOffer);
        }

        fn create_answer(&self) {
            self.push(EngineCall::CreateAnswer);
        }

        fn set_local_description(&self, desc: SessionDescription) {
            self.push(EngineCall::SetLocal(desc));
        }

        fn set_remote_description(&self, desc: SessionDescription) {
            self.push(EngineCall::SetRemote(desc));
        }

        fn add_ice_candidate(&self, candidate: IceCandidate) {
            self.push(EngineCall::AddCandidate(candidate));
        }

        fn add_track(&self, track: MediaTrack) {
            self.push(EngineCall::AddTrack(track));
        }

        fn close(&self) {
            self.push(EngineCall::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_rtc_ice_state() {
        assert_eq!(raw_ice_state(RTCIceConnectionState::Unspecified), RawIceState::New);
        assert_eq!(raw_ice_state(RTCIceConnectionState::Checking), RawIceState::Checking);
        assert_eq!(raw_ice_state(RTCIceConnectionState::Connected), RawIceState::Connected);
        assert_eq!(raw_ice_state(RTCIceConnectionState::Completed), RawIceState::Completed);
        assert_eq!(raw_ice_state(RTCIceConnectionState::Disconnected), RawIceState::Disconnected);
        assert_eq!(raw_ice_state(RTCIceConnectionState::Failed), RawIceState::Failed);
        assert_eq!(raw_ice_state(RTCIceConnectionState::Closed), RawIceState::Closed);
    }

    #[test]
    fn closed_gatherer_is_not_reported() {
        assert_eq!(gathering_state(RTCIceGathererState::Complete), Some(GatheringState::Complete));
        assert_eq!(gathering_state(RTCIceGathererState::Closed), None);
    }

    #[test]
    fn ice_server_urls_get_a_scheme() {
        let servers = ice_servers(&[ServerConfig {
            id: "relay".into(),
            r#type: "turn".into(),
            url: "turn.example.org:3478".into(),
            username: Some("user".into()),
            credential: Some("secret".into()),
        }]);
        assert_eq!(servers[0].urls, vec!["turn:turn.example.org:3478".to_string()]);
        assert_eq!(servers[0].username, "user");
        assert_eq!(servers[0].credential, "secret");
    }

    #[test]
    fn factory_rejects_invalid_config() {
        let config = ClientConfig {
            ice_servers: vec![ServerConfig {
                id: "empty".into(),
                r#type: "stun".into(),
                url: String::new(),
                username: None,
                credential: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            EngineFactory::new(config),
            Err(NegotiationError::InvalidConfig(_))
        ));
    }
}
