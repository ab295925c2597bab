//! Binary codec for the host/guest embedding protocol.
//!
//! Translates between host-side value structures (model description,
//! variable-value bundles, request/response messages) and the byte blobs
//! exchanged through guest linear memory. Encoding and decoding are
//! symmetric: `decode(encode(x)) == x` for every well-formed value.
//!
//! # Module Organization
//!
//! - [`error`]: error types for codec operations
//! - [`buffer`]: byte-size helpers
//! - [`writer`]: growable scratch builder (encode side)
//! - [`reader`]: bounds-checked cursor (decode side)
//! - [`encode`]: request and description encoders
//! - [`decode`]: response and description decoders
//!
//! All integers are little-endian; strings are `u32` length + UTF-8 bytes.

pub(crate) mod buffer;
pub mod decode;
mod encode;
mod error;
mod reader;
mod writer;

pub use error::CodecError;

use crate::model::{LogLevel, ModelDescription, VarValues};
use writer::MessageWriter;

/// Signature word every model description blob starts with (`b"MDS1"`).
pub const DESCRIPTION_MAGIC: u32 = u32::from_le_bytes(*b"MDS1");

/// Schema version the decoder accepts.
pub const DESCRIPTION_VERSION: u16 = 1;

/// Initial scratch capacity; typical requests are far smaller.
const SCRATCH_CAPACITY: usize = 4096;

/// Message codec with a single owned scratch builder.
///
/// Each `*_req` method encodes one request into the scratch buffer and
/// returns the finished bytes. The scratch is reset (capacity retained)
/// by [`Codec::reset`], which the runtime calls at the end of every
/// request/response round trip.
#[derive(Debug, Default)]
pub struct Codec {
    writer: MessageWriter,
}

impl Codec {
    pub fn new() -> Self {
        Self {
            writer: MessageWriter::with_capacity(SCRATCH_CAPACITY),
        }
    }

    /// Clear the scratch builder, keeping its allocation.
    pub fn reset(&mut self) {
        self.writer.reset();
    }

    /// Encode an `init` request.
    #[allow(clippy::too_many_arguments)]
    pub fn init_req(
        &mut self,
        model_id: &str,
        start_time: f64,
        end_time: Option<f64>,
        tolerance: Option<f64>,
        log_level: LogLevel,
        check: bool,
        initial_values: &VarValues,
    ) -> &[u8] {
        self.writer.reset();
        encode::put_init_req(
            &mut self.writer,
            model_id,
            start_time,
            end_time,
            tolerance,
            log_level,
            check,
            initial_values,
        );
        self.writer.as_bytes()
    }

    /// Encode a `setValues` request.
    pub fn set_values_req(&mut self, values: &VarValues) -> &[u8] {
        self.writer.reset();
        encode::put_set_values_req(&mut self.writer, values);
        self.writer.as_bytes()
    }

    /// Encode a `getValues` request.
    pub fn get_values_req(&mut self, ids: &[i32]) -> &[u8] {
        self.writer.reset();
        encode::put_get_values_req(&mut self.writer, ids);
        self.writer.as_bytes()
    }

    /// Encode a `doStep` request.
    pub fn do_step_req(&mut self, current_time: f64, timestep: f64) -> &[u8] {
        self.writer.reset();
        encode::put_do_step_req(&mut self.writer, current_time, timestep);
        self.writer.as_bytes()
    }

    /// Encode a `resetStep` request.
    pub fn reset_step_req(&mut self, time: f64) -> &[u8] {
        self.writer.reset();
        encode::put_reset_step_req(&mut self.writer, time);
        self.writer.as_bytes()
    }

    /// Encode a model description blob with the layout guests emit.
    ///
    /// Used by module tooling and tests; the runtime itself only decodes
    /// descriptions.
    pub fn model_description(&mut self, md: &ModelDescription) -> &[u8] {
        self.writer.reset();
        encode::put_model_description(&mut self.writer, md);
        self.writer.as_bytes()
    }
}
