use quiz_core::model::Actor;

/// Supplies the actor on whose behalf quizzes are authored and taken.
pub trait IdentityProvider: Send + Sync {
    /// `None` means anonymous.
    fn current_actor(&self) -> Option<Actor>;
}

/// Identity fixed at construction, e.g. from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    actor: Option<Actor>,
}

impl StaticIdentity {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { actor: None }
    }

    #[must_use]
    pub fn signed_in(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.clone()
    }
}
