//! Per-key durable write policies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pulse_core::Payload;

type Acceptor = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;

/// Decides how a key interacts with the durable store.
///
/// A key without a policy never touches the store. With a policy, a
/// durable record younger than `max_age` is served when the in-memory
/// entry is missing, and fetched values passing the acceptance check are
/// written back.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pulse_cache::WritePolicy;
/// use serde_json::json;
///
/// let policy = WritePolicy::positive_field(Duration::from_secs(600), "balance");
/// assert!(policy.accepts(&json!({"balance": 12.5})));
/// assert!(!policy.accepts(&json!({"balance": 0})));
/// ```
#[derive(Clone)]
pub struct WritePolicy {
    max_age: Duration,
    accept: Acceptor,
}

impl WritePolicy {
    /// Creates a policy that persists every fetched value.
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            accept: Arc::new(|_| true),
        }
    }

    /// Persists only payloads whose numeric `field` is greater than zero.
    ///
    /// Numbers encoded as strings are accepted too.
    pub fn positive_field(max_age: Duration, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(max_age).accept_when(move |payload| {
            payload
                .get(&field)
                .and_then(|v| v.as_f64().or_else(|| v.as_str()?.parse().ok()))
                .is_some_and(|v| v > 0.0)
        })
    }

    /// Replaces the acceptance check.
    pub fn accept_when(
        mut self,
        accept: impl Fn(&Payload) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.accept = Arc::new(accept);
        self
    }

    /// Maximum age of a durable record that may still be served.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns true if `payload` should be persisted.
    pub fn accepts(&self, payload: &Payload) -> bool {
        (self.accept)(payload)
    }
}

impl fmt::Debug for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritePolicy")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}
