use crate::error::{DescriptionSide, NegotiationError};
use crate::peer::ice::CandidateQueue;
use crate::peer::types::{IceCandidate, SessionDescription, SessionRole};

/// Состояние одного SDP описания (локального или удалённого)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DescriptionSlot {
    #[default]
    Empty,
    /// Движок создаёт описание, результата ещё нет
    Requested,
    /// Описание передано движку, подтверждения ещё нет
    Pending(SessionDescription),
    Applied(SessionDescription),
}

impl DescriptionSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn description(&self) -> Option<&SessionDescription> {
        match self {
            Self::Pending(desc) | Self::Applied(desc) => Some(desc),
            Self::Empty | Self::Requested => None,
        }
    }
}

/// Результат подтверждения от движка
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// Описание только что применено
    Applied(SessionDescription),
    /// Описание уже было применено ранее
    Duplicate,
    /// Подтверждение без запроса
    Unexpected,
}

/// Явное состояние переговоров вместо набора nullable-полей.
#[derive(Debug, Default)]
pub struct NegotiationState {
    role: SessionRole,
    local: DescriptionSlot,
    remote: DescriptionSlot,
    queue: CandidateQueue,
}

impl NegotiationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn local(&self) -> &DescriptionSlot {
        &self.local
    }

    pub fn remote(&self) -> &DescriptionSlot {
        &self.remote
    }

    pub fn queue(&self) -> &CandidateQueue {
        &self.queue
    }

    pub fn local_description_set(&self) -> bool {
        self.local.is_applied()
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote.is_applied()
    }

    /// Назначает роль. Повторный запрос той же роли допустим, смена роли нет.
    /// Возвращает `true`, если роль назначена этим вызовом.
    pub fn assign_role(
        &mut self,
        requested: SessionRole,
        operation: &'static str,
    ) -> Result<bool, NegotiationError> {
        match self.role {
            SessionRole::Unassigned => {
                self.role = requested;
                Ok(true)
            }
            current if current == requested => Ok(false),
            current => Err(NegotiationError::InvalidRole {
                operation,
                role: current,
            }),
        }
    }

    pub fn ensure_local_empty(&self) -> Result<(), NegotiationError> {
        if self.local.is_empty() {
            Ok(())
        } else {
            Err(NegotiationError::DescriptionAlreadySet(DescriptionSide::Local))
        }
    }

    pub fn request_local(&mut self) -> Result<(), NegotiationError> {
        self.ensure_local_empty()?;
        self.local = DescriptionSlot::Requested;
        Ok(())
    }

    /// Движок создал описание; ожидаем его только после `request_local`
    pub fn local_created(&mut self, desc: SessionDescription) -> Result<(), NegotiationError> {
        match self.local {
            DescriptionSlot::Requested => {
                self.local = DescriptionSlot::Pending(desc);
                Ok(())
            }
            _ => Err(NegotiationError::DescriptionAlreadySet(DescriptionSide::Local)),
        }
    }

    pub fn local_applied(&mut self) -> Ack {
        Self::acknowledge(&mut self.local)
    }

    pub fn submit_remote(&mut self, desc: SessionDescription) -> Result<(), NegotiationError> {
        if !self.remote.is_empty() {
            return Err(NegotiationError::DescriptionAlreadySet(DescriptionSide::Remote));
        }
        self.remote = DescriptionSlot::Pending(desc);
        Ok(())
    }

    pub fn remote_applied(&mut self) -> Ack {
        Self::acknowledge(&mut self.remote)
    }

    /// Откат неудавшейся попытки, чтобы приложение могло повторить её
    pub fn reset(&mut self, side: DescriptionSide) {
        match side {
            DescriptionSide::Local => self.local = DescriptionSlot::Empty,
            DescriptionSide::Remote => self.remote = DescriptionSlot::Empty,
        }
    }

    /// Единственная точка решения "в очередь или сразу в движок".
    /// `Err` возвращает кандидат, который надо применить немедленно.
    pub fn enqueue_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), IceCandidate> {
        self.queue.enqueue(candidate)
    }

    /// Сливает очередь только если удалённое описание применено
    pub fn drain_candidates<F>(&mut self, sink: F) -> Option<usize>
    where
        F: FnMut(IceCandidate),
    {
        if !self.remote.is_applied() {
            return None;
        }
        Some(self.queue.drain_into(sink))
    }

    fn acknowledge(slot: &mut DescriptionSlot) -> Ack {
        match std::mem::take(slot) {
            DescriptionSlot::Pending(desc) => {
                *slot = DescriptionSlot::Applied(desc.clone());
                Ack::Applied(desc)
            }
            applied @ DescriptionSlot::Applied(_) => {
                *slot = applied;
                Ack::Duplicate
            }
            other => {
                *slot = other;
                Ack::Unexpected
            }
        }
    }
}
