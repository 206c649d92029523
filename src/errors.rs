//! The error taxonomy for the render pipeline.  The variants map onto
//! containment scopes: `Config` aborts before any work is scheduled,
//! `Io` and `Encode` abort the current invocation, and `Decode` is
//! recoverable — the assembler logs it and moves on to the next band.

use std::io;

/// Everything that can go wrong between parsing a configuration and
/// closing the final image.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The invocation was misconfigured.  Reported before any band is
    /// scheduled.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// An I/O failure on the scratch directory, a chunk artifact, or
    /// the final output file.  Fatal for the invocation.
    #[fail(display = "{}: {}", path, cause)]
    Io {
        /// The file or directory the operation touched.
        path: String,
        /// The underlying failure.
        cause: io::Error,
    },

    /// A chunk artifact could not be decoded: missing, truncated, not
    /// an image, or the wrong shape.  Recoverable — the band is
    /// skipped, not the run.
    #[fail(display = "chunk {} unreadable: {}", band, reason)]
    Decode {
        /// Index of the band whose artifact failed to decode.
        band: usize,
        /// What the codec had to say about it.
        reason: String,
    },

    /// The final-image encoder rejected the stream.  Fatal for the
    /// invocation.
    #[fail(display = "encoding {} failed: {}", path, reason)]
    Encode {
        /// The output file being written.
        path: String,
        /// What the encoder had to say about it.
        reason: String,
    },
}

impl RenderError {
    /// Shorthand for a configuration failure.
    pub fn config<S: Into<String>>(msg: S) -> RenderError {
        RenderError::Config(msg.into())
    }
}
