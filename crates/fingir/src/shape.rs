//! Collaborator identity and call-shape identity.
//!
//! A [`CallShape`] names "this collaborator, this member, this argument
//! pattern". The argument pattern itself is produced and compared by the
//! external matching primitive; the engine only requires it to be
//! equality-comparable, so it is carried here as an opaque string.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identity of one tracked mock object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollaboratorId(Uuid);

impl CollaboratorId {
    /// Generate a fresh identity
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CollaboratorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CollaboratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One independently-created mock object whose invocations are tracked
/// by a sequence engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collaborator {
    id: CollaboratorId,
    name: String,
}

impl Collaborator {
    /// Create a collaborator with a human-readable name for failure messages
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CollaboratorId::new(),
            name: name.into(),
        }
    }

    /// The collaborator's unique identity
    #[must_use]
    pub fn id(&self) -> CollaboratorId {
        self.id
    }

    /// The collaborator's display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the shape of a call on this collaborator
    ///
    /// `pattern` is the argument pattern as rendered by the external
    /// matching primitive, e.g. `"1"` or `"is_positive()"`.
    #[must_use]
    pub fn call(&self, member: impl Into<String>, pattern: impl Into<String>) -> CallShape {
        CallShape {
            collaborator: self.id,
            collaborator_name: self.name.clone(),
            member: member.into(),
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The identity of "this collaborator, this member, this argument pattern"
///
/// Two declarations with an equal `CallShape` are the same expected call
/// point. Equality is structural over collaborator identity, member name,
/// and argument pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallShape {
    collaborator: CollaboratorId,
    collaborator_name: String,
    member: String,
    pattern: String,
}

impl CallShape {
    /// Identity of the collaborator this shape belongs to
    #[must_use]
    pub fn collaborator(&self) -> CollaboratorId {
        self.collaborator
    }

    /// Member (method) name
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Opaque argument pattern, as rendered by the external matcher
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.collaborator_name, self.member, self.pattern
        )
    }
}
