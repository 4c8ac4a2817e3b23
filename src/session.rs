use crate::error::{NegotiationError, Result};
use crate::peer::engine::{EngineEventRx, MediaEngine};
use crate::peer::events::EventSink;
use crate::peer::negotiator::SessionNegotiator;
use crate::peer::types::{IceCandidate, MediaTrack, SessionDescription};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};

type Reply = oneshot::Sender<Result<()>>;

enum SessionCommand {
    CreateOffer(Reply),
    CreateAnswer(Reply),
    SetRemoteDescription(SessionDescription, Reply),
    AddRemoteCandidate(IceCandidate, Reply),
    Close,
}

/// Handle сессии.
///
/// Переговорщик живёт в отдельной задаче и получает команды приложения и
/// события движка через каналы, по одному за раз. Когда все handle'ы
/// уничтожены или вызван `close`, сессия разрушается, а поздние события
/// движка отбрасываются.
pub struct Session {
    id: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

impl Session {
    pub fn spawn<E, S>(
        id: impl Into<String>,
        engine: E,
        sink: S,
        events: EngineEventRx,
        tracks: Vec<MediaTrack>,
    ) -> Self
    where
        E: MediaEngine + 'static,
        S: EventSink + 'static,
    {
        let id = id.into();
        let (commands, rx) = mpsc::unbounded_channel();
        let negotiator = SessionNegotiator::new(id.clone(), engine, sink, tracks);
        let task = tokio::spawn(run(negotiator, rx, events).instrument(info_span!("session", id = %id)));
        Self { id, commands, task }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn create_offer(&self) -> Result<()> {
        self.request(SessionCommand::CreateOffer).await
    }

    pub async fn create_answer(&self) -> Result<()> {
        self.request(SessionCommand::CreateAnswer).await
    }

    pub async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.request(|reply| SessionCommand::SetRemoteDescription(desc, reply))
            .await
    }

    pub async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.request(|reply| SessionCommand::AddRemoteCandidate(candidate, reply))
            .await
    }

    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close);
    }

    /// Закрывает сессию и ждёт завершения её задачи
    pub async fn shutdown(self) {
        self.close();
        if let Err(e) = self.task.await {
            debug!(session = %self.id, error = %e, "session task ended abnormally");
        }
    }

    async fn request<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce(Reply) -> SessionCommand,
    {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| NegotiationError::SessionClosed(self.id.clone()))?;
        response
            .await
            .map_err(|_| NegotiationError::SessionClosed(self.id.clone()))?
    }
}

async fn run<E, S>(
    mut negotiator: SessionNegotiator<E, S>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    mut events: EngineEventRx,
) where
    E: MediaEngine,
    S: EventSink,
{
    debug!("session started");
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Close) | None => break,
                Some(command) => handle_command(&mut negotiator, command),
            },
            Some(event) = events.recv() => negotiator.handle_engine_event(event),
        }
    }
    negotiator.close();
    debug!("session stopped");
}

fn handle_command<E, S>(negotiator: &mut SessionNegotiator<E, S>, command: SessionCommand)
where
    E: MediaEngine,
    S: EventSink,
{
    let (result, reply) = match command {
        SessionCommand::CreateOffer(reply) => (negotiator.create_offer(), reply),
        SessionCommand::CreateAnswer(reply) => (negotiator.create_answer(), reply),
        SessionCommand::SetRemoteDescription(desc, reply) => {
            (negotiator.set_remote_description(desc), reply)
        }
        SessionCommand::AddRemoteCandidate(candidate, reply) => {
            (negotiator.add_remote_candidate(candidate), reply)
        }
        SessionCommand::Close => return,
    };
    let _ = reply.send(result);
}
