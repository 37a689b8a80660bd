use std::io;

use comms::{OnoReceiver, OnoSender};
use machine_learning::checkpoint::Checkpoint;
use tokio::io::{AsyncRead, AsyncWrite};

/// This trait acts as an indirection layer, allowing the `ServerBuilder` to return
/// `ParameterServer`s of any optimizer from its unique build method.
#[async_trait::async_trait]
pub trait Server<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Indirection method for `ParameterServer::run`.
    async fn run(&mut self) -> io::Result<()>;

    /// Indirection method for `ParameterServer::spawn`.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    fn spawn(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>);

    /// Indirection method for `ParameterServer::snapshot`.
    async fn snapshot(&mut self) -> Checkpoint;
}
