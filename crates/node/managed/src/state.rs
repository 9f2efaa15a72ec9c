//! Lifecycle of the managed-mode session.

/// The state of a managed-mode session.
///
/// `Stopped → Starting → Running ⇄ Resetting → Stopping → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
pub enum SessionState {
    /// Not serving the supervisor.
    #[default]
    #[display("stopped")]
    Stopped,
    /// Coming up.
    #[display("starting")]
    Starting,
    /// Serving the supervisor.
    #[display("running")]
    Running,
    /// Waiting for the pipeline to confirm a reset.
    #[display("resetting")]
    Resetting,
    /// Shutting down.
    #[display("stopping")]
    Stopping,
}

impl SessionState {
    /// Returns true if commands from the supervisor are accepted.
    pub const fn accepts_commands(&self) -> bool {
        matches!(self, Self::Running | Self::Resetting)
    }

    /// Returns true if the session may move from `self` to `next`.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Stopped, Self::Starting) |
                (Self::Starting, Self::Running) |
                (Self::Running, Self::Resetting) |
                (Self::Resetting, Self::Resetting) |
                (Self::Resetting, Self::Running) |
                (Self::Starting | Self::Running | Self::Resetting, Self::Stopping) |
                (Self::Stopping, Self::Stopped)
        )
    }
}
