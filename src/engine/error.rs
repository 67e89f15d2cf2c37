use ulid::Ulid;

use super::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    /// Stay rejected before any persistence call (e.g. checkout not
    /// after checkin, missing required field).
    InvalidStay(&'static str),
    /// Candidate stay collides with existing occupancy. Carries the
    /// colliding reservation ids for diagnostic display.
    Conflict(Vec<Ulid>),
    NotFound(Ulid),
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidStay(msg) => write!(f, "invalid stay: {msg}"),
            EngineError::Conflict(ids) => {
                write!(f, "dates conflict with {} existing reservation(s):", ids.len())?;
                for id in ids {
                    write!(f, " {id}")?;
                }
                Ok(())
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
