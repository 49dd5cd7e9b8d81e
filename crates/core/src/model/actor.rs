use serde::{Deserialize, Serialize};

use crate::model::ids::ActorId;

/// The identity taking or authoring a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub email: String,
}

impl Actor {
    #[must_use]
    pub fn new(id: ActorId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Attribution record for content authored by this actor.
    #[must_use]
    pub fn as_author(&self) -> Author {
        Author {
            id: Some(self.id),
            name: self.name.clone(),
        }
    }
}

/// Creator attribution stored on a quiz.
///
/// Imported quizzes may carry only a display name (e.g. `admin`), so the
/// actor id is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<ActorId>,
    pub name: String,
}

impl Author {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}
