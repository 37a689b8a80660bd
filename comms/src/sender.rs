use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{FRAME_LEN_SIZE, FrameLen, MAX_FRAME_LEN, Serialize};

/// Writes length prefixed frames to an async writer.
pub struct OnoSender<W: AsyncWrite + Unpin> {
    tx: W,
    frame: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            frame: Vec::new(),
        }
    }

    /// Sends `msg` as a single frame and flushes the writer.
    ///
    /// The owned part of the message is staged after the length prefix, a borrowed payload
    /// is written straight from the caller's memory.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// An `io::Error` if writing failed or the frame is larger than `MAX_FRAME_LEN`.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.frame.clear();
        self.frame.extend_from_slice(&[0; FRAME_LEN_SIZE]);

        let payload = msg.serialize(&mut self.frame);
        let len = self.frame.len() - FRAME_LEN_SIZE + payload.map_or(0, <[u8]>::len);
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
            ));
        }

        self.frame[..FRAME_LEN_SIZE].copy_from_slice(&(len as FrameLen).to_be_bytes());
        self.tx.write_all(&self.frame).await?;

        if let Some(payload) = payload {
            self.tx.write_all(payload).await?;
        }

        self.tx.flush().await
    }
}
