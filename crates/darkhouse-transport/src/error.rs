/// Errors raised by a transport or one of its connections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or completing a handshake failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
