use crate::peer::types::IceCandidate;
use tracing::{debug, warn};

/// Кандидаты, полученные до установки remote description.
///
/// Очередь существует (`Present`) пока удалённое описание не применено и
/// переходит в `Drained` ровно один раз; обратного перехода нет.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateQueue {
    Present(Vec<IceCandidate>),
    Drained,
}

impl Default for CandidateQueue {
    fn default() -> Self {
        Self::Present(Vec::new())
    }
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ставит кандидат в очередь. После слива очередь больше не принимает
    /// кандидатов и возвращает его обратно, чтобы вызывающий применил его сразу.
    pub fn enqueue(&mut self, candidate: IceCandidate) -> Result<(), IceCandidate> {
        match self {
            Self::Present(pending) => {
                pending.push(candidate);
                Ok(())
            }
            Self::Drained => Err(candidate),
        }
    }

    /// Отдаёт все накопленные кандидаты в `sink` в порядке поступления и
    /// помечает очередь слитой. Повторный вызов ничего не делает.
    pub fn drain_into<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(IceCandidate),
    {
        match std::mem::replace(self, Self::Drained) {
            Self::Present(pending) => {
                let count = pending.len();
                for candidate in pending {
                    sink(candidate);
                }
                count
            }
            Self::Drained => 0,
        }
    }

    pub fn is_drained(&self) -> bool {
        matches!(self, Self::Drained)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Present(pending) => pending.len(),
            Self::Drained => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
    Unknown,
}

/// Тип кандидата по полю `typ` строки candidate
pub fn candidate_kind(candidate: &IceCandidate) -> CandidateKind {
    let mut fields = candidate.candidate.split_whitespace();
    while let Some(field) = fields.next() {
        if field == "typ" {
            return match fields.next() {
                Some("host") => CandidateKind::Host,
                Some("srflx") => CandidateKind::ServerReflexive,
                Some("prflx") => CandidateKind::PeerReflexive,
                Some("relay") => CandidateKind::Relay,
                _ => CandidateKind::Unknown,
            };
        }
    }
    CandidateKind::Unknown
}

/// Счётчики локальных кандидатов по типам
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateStats {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
    pub other: usize,
}

impl CandidateStats {
    pub fn record(&mut self, candidate: &IceCandidate) {
        match candidate_kind(candidate) {
            CandidateKind::Host => self.host += 1,
            CandidateKind::ServerReflexive => self.srflx += 1,
            CandidateKind::Relay => self.relay += 1,
            CandidateKind::PeerReflexive | CandidateKind::Unknown => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.host + self.srflx + self.relay + self.other
    }
}

pub fn analyze_candidates(candidates: &[IceCandidate]) -> CandidateStats {
    let mut stats = CandidateStats::default();
    for candidate in candidates {
        stats.record(candidate);
    }
    report_candidates(&stats);
    stats
}

pub fn report_candidates(stats: &CandidateStats) {
    debug!(
        host = stats.host,
        srflx = stats.srflx,
        relay = stats.relay,
        "candidate analysis"
    );
    if stats.relay == 0 {
        warn!("no TURN relay candidates found, connection through NAT may fail");
    }
}
