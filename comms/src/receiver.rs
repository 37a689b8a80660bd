use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, FRAME_LEN_SIZE, FrameLen, MAX_FRAME_LEN};

/// Reads length prefixed frames from an async reader.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Waits for the next frame and deserializes it.
    ///
    /// The frame is read into `f32` storage so that parameter and gradient payloads, which
    /// start at a 4 byte offset, can be borrowed in place instead of copied.
    ///
    /// # Arguments
    /// * `buf` - The storage for the frame, the returned `T` borrows from it.
    ///
    /// # Returns
    /// The deserialized `T`, or an `io::Error` if the peer hung up, the frame is larger than
    /// `MAX_FRAME_LEN` or it can't be deserialized.
    pub async fn recv_into<'buf, T>(&mut self, buf: &'buf mut Vec<f32>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
    {
        let len = self.read_frame_len().await?;

        buf.clear();
        buf.resize(len.div_ceil(size_of::<f32>()), 0.);

        let frame = &mut bytemuck::cast_slice_mut::<f32, u8>(buf)[..len];
        self.rx.read_exact(frame).await?;

        T::deserialize(frame)
    }

    async fn read_frame_len(&mut self) -> io::Result<usize> {
        let mut prefix = [0; FRAME_LEN_SIZE];
        self.rx.read_exact(&mut prefix).await?;

        let len = FrameLen::from_be_bytes(prefix);
        match usize::try_from(len) {
            Ok(len) if len <= MAX_FRAME_LEN => Ok(len),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
            )),
        }
    }
}
