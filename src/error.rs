use thiserror::Error;

/// Errors that can occur while configuring or querying the navigation policy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// A required field was missing or out of range before the policy
    /// could be constructed.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A state row had a different width than the network expects.
    #[error("state row has width {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A joint state with no observed agents was presented to attention
    /// pooling, which is undefined over an empty agent axis.
    #[error("joint state contains no observed agents")]
    EmptyAgentSet,

    /// A collaborator (action-space construction, propagation, reward)
    /// failed; the message is passed through unmodified.
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}
