use crate::codec::Codec;
use bytes::BytesMut;
use compression_codecs::EncodeV2;
use compression_core::util::{PartialBuffer, WriteBuffer};
use std::io;

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB scratch buffer

/// A streaming encoder that appends compressed output to a caller-supplied buffer.
pub(crate) struct Encoder {
    codec: Codec,
    inner: Box<dyn EncodeV2 + Send>,
    scratch: Vec<u8>,
}

impl Encoder {
    pub(crate) fn new(codec: Codec) -> Self {
        Self {
            codec,
            inner: codec.encoder(),
            scratch: vec![0u8; OUTPUT_BUFFER_SIZE],
        }
    }

    pub(crate) fn codec(&self) -> Codec {
        self.codec
    }

    /// Discards any in-progress stream and starts a new one. The scratch
    /// buffer is kept.
    pub(crate) fn reset(&mut self) {
        self.inner = self.codec.encoder();
    }

    /// Compresses all of `input`, appending whatever the codec emits to `out`.
    pub(crate) fn encode(&mut self, input: &[u8], out: &mut BytesMut) -> io::Result<()> {
        let mut input_buf = PartialBuffer::new(input);

        while input_buf.written_len() < input.len() {
            let consumed = input_buf.written_len();
            let mut output = WriteBuffer::new_initialized(self.scratch.as_mut_slice());
            self.inner
                .encode(&mut input_buf, &mut output)
                .map_err(io::Error::other)?;

            let written = output.written_len();
            out.extend_from_slice(&self.scratch[..written]);

            if written == 0 && input_buf.written_len() == consumed {
                return Err(io::Error::other("encoder made no progress"));
            }
        }
        Ok(())
    }

    /// Forces buffered input out as a complete block.
    pub(crate) fn flush(&mut self, out: &mut BytesMut) -> io::Result<()> {
        loop {
            let mut output = WriteBuffer::new_initialized(self.scratch.as_mut_slice());
            let done = self
                .inner
                .flush(&mut output)
                .map_err(io::Error::other)?;

            let written = output.written_len();
            out.extend_from_slice(&self.scratch[..written]);
            if done {
                return Ok(());
            }
        }
    }

    /// Ends the stream, appending the codec trailer.
    pub(crate) fn finish(&mut self, out: &mut BytesMut) -> io::Result<()> {
        loop {
            let mut output = WriteBuffer::new_initialized(self.scratch.as_mut_slice());
            let done = self
                .inner
                .finish(&mut output)
                .map_err(io::Error::other)?;

            let written = output.written_len();
            out.extend_from_slice(&self.scratch[..written]);
            if done {
                return Ok(());
            }
        }
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
