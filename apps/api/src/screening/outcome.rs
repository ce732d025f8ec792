use serde::{Deserialize, Serialize};

/// Result of a screening call that never fails outright.
///
/// `Degraded` carries the documented fallback value used when the remote
/// service could not be reached or returned nothing usable. Both variants
/// hold a value the caller can render.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Degraded(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Degraded,
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Success(v) | Outcome::Degraded(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Success(v) | Outcome::Degraded(v) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Success(_) => OutcomeStatus::Success,
            Outcome::Degraded(_) => OutcomeStatus::Degraded,
        }
    }

    /// Splits into the plain value and its status, for response bodies.
    pub fn into_parts(self) -> (T, OutcomeStatus) {
        let status = self.status();
        (self.into_value(), status)
    }
}
