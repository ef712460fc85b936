use thiserror::Error as ThisError;

/// Errors that can stop a process from starting or from serving.
///
/// Unreachable peers are deliberately absent: the transport reports those as
/// a failed send and the protocol treats the peer as down for that attempt.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The process id given on the command line is not in the membership
    #[error("unknown process id '{given}'; valid ids: {valid}")]
    UnknownProcess { given: String, valid: String },

    /// Invalid injected configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket level failure outside of a peer send
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The processor task is no longer running
    #[error("processor channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
