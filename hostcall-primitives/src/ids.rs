//! Call identifiers.

use std::fmt::{self, Display, Formatter};

use uuid::Uuid;

/// Identifier tagging one dispatched call in the `tracing` span that follows
/// it from caller to host thread.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CallId(Uuid);

impl CallId {
    /// Generates a random call identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for CallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_distinct_hyphenated_uuids() {
        let first = CallId::random();
        let second = CallId::random();
        assert_ne!(first, second);

        let rendered = first.to_string();
        assert_eq!(rendered.len(), 36);
        assert_eq!(rendered.matches('-').count(), 4);
    }
}
