use serde::Serialize;

/// Value that may still be on its way from the chain.
///
/// `Loading` is distinct from any legitimate value so that zero RP, `false`
/// and "not known yet" never collapse into each other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Loadable<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Loadable::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Loadable<&T> {
        match self {
            Loadable::Loading => Loadable::Loading,
            Loadable::Ready(value) => Loadable::Ready(value),
            Loadable::Failed(err) => Loadable::Failed(err.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loadable<U> {
        match self {
            Loadable::Loading => Loadable::Loading,
            Loadable::Ready(value) => Loadable::Ready(f(value)),
            Loadable::Failed(err) => Loadable::Failed(err),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Loadable<U>) -> Loadable<U> {
        match self {
            Loadable::Loading => Loadable::Loading,
            Loadable::Ready(value) => f(value),
            Loadable::Failed(err) => Loadable::Failed(err),
        }
    }

    /// Combines two loadables. A failure wins over loading so that a broken
    /// read is reported instead of spinning forever.
    pub fn zip<U>(self, other: Loadable<U>) -> Loadable<(T, U)> {
        match (self, other) {
            (Loadable::Failed(err), _) | (_, Loadable::Failed(err)) => Loadable::Failed(err),
            (Loadable::Ready(a), Loadable::Ready(b)) => Loadable::Ready((a, b)),
            _ => Loadable::Loading,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.ready().unwrap_or(default)
    }
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Loading
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Loadable<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Loadable::Ready(value),
            Err(err) => Loadable::Failed(err.to_string()),
        }
    }
}
