//! Error types for the Strata engine.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use thiserror::Error;

use crate::entity::ArchetypeId;
use crate::mask::Signature;

/// Convenience result alias used throughout Strata.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Strata operations.
#[derive(Debug, Error)]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context naming the archetype or field being processed.
    pub context: Option<String>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Creates a duplicate schema signature error.
    #[must_use]
    pub fn duplicate_signature(signature: Signature) -> Self {
        Self::new(ErrorKind::DuplicateSignature(signature))
    }

    /// Creates a duplicate numeric archetype id error.
    #[must_use]
    pub fn duplicate_archetype_id(id: ArchetypeId) -> Self {
        Self::new(ErrorKind::DuplicateArchetypeId(id))
    }

    /// Creates a malformed field declaration error.
    #[must_use]
    pub fn invalid_field_config(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFieldConfig(reason.into()))
    }

    /// Creates an archetype-not-found error.
    #[must_use]
    pub fn archetype_not_found(signature: Signature) -> Self {
        Self::new(ErrorKind::ArchetypeNotFound(signature))
    }

    /// Creates an invalid requested slot index error.
    #[must_use]
    pub fn invalid_requested_index(index: u32) -> Self {
        Self::new(ErrorKind::InvalidRequestedIndex(index))
    }

    /// Creates a stream exhaustion error.
    #[must_use]
    pub fn stream_exhausted(requested: usize, available: usize) -> Self {
        Self::new(ErrorKind::StreamExhausted {
            requested,
            available,
        })
    }

    /// Creates a seek-out-of-range error.
    #[must_use]
    pub fn seek_out_of_range(position: u64, length: u64) -> Self {
        Self::new(ErrorKind::SeekOutOfRange { position, length })
    }

    /// Creates an unsupported format version error.
    #[must_use]
    pub fn unsupported_format_version(found: u32, supported: u32) -> Self {
        Self::new(ErrorKind::UnsupportedFormatVersion { found, supported })
    }

    /// Creates a duplicate field block error.
    #[must_use]
    pub fn duplicate_field_block(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateFieldBlock(name.into()))
    }

    /// Creates a field block overrun error.
    #[must_use]
    pub fn field_block_overrun(name: impl Into<String>, declared: u64, consumed: u64) -> Self {
        Self::new(ErrorKind::FieldBlockOverrun {
            name: name.into(),
            declared,
            consumed,
        })
    }

    /// Creates a cannot-skip-field error (version 1 streams only).
    #[must_use]
    pub fn cannot_skip_field(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::CannotSkipField(name.into()))
    }

    /// Creates a POD version mismatch error.
    #[must_use]
    pub fn pod_version_mismatch(name: impl Into<String>, expected: u8, found: u8) -> Self {
        Self::new(ErrorKind::PodVersionMismatch {
            name: name.into(),
            expected,
            found,
        })
    }

    /// Creates a too-large field block error.
    #[must_use]
    pub fn field_block_too_large(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::FieldBlockTooLarge(name.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// An archetype with the same schema signature is already registered.
    #[error("duplicate archetype signature: {0:?}")]
    DuplicateSignature(Signature),

    /// An archetype with the same numeric id is already registered.
    #[error("duplicate archetype id: {0}")]
    DuplicateArchetypeId(ArchetypeId),

    /// Malformed field declarations at registration time.
    #[error("invalid field configuration: {0}")]
    InvalidFieldConfig(String),

    /// No registered archetype matches the requested signature.
    #[error("archetype not found for {0:?}")]
    ArchetypeNotFound(Signature),

    /// A requested creation index is neither the append position nor in
    /// the free list.
    #[error("invalid requested slot index: {0}")]
    InvalidRequestedIndex(u32),

    /// A read was attempted past the end of the stream.
    #[error("stream exhausted: requested {requested} bytes, {available} available")]
    StreamExhausted {
        /// Bytes the caller asked for.
        requested: usize,
        /// Bytes remaining in the stream.
        available: usize,
    },

    /// A seek targeted a position outside the stream.
    #[error("seek out of range: position {position}, stream length {length}")]
    SeekOutOfRange {
        /// The requested position.
        position: u64,
        /// The stream's current length.
        length: u64,
    },

    /// The stream was written by a newer format version.
    #[error("unsupported format version {found} (newest supported is {supported})")]
    UnsupportedFormatVersion {
        /// Version found in the stream.
        found: u32,
        /// Newest version this build understands.
        supported: u32,
    },

    /// A field block name matched twice within one archetype block.
    #[error("duplicate field block: {0}")]
    DuplicateFieldBlock(String),

    /// A field loader consumed more bytes than the block declared.
    #[error("field block overrun in {name}: declared {declared} bytes, consumed {consumed}")]
    FieldBlockOverrun {
        /// The field block's name.
        name: String,
        /// The byte size declared in the stream.
        declared: u64,
        /// The bytes the loader actually consumed.
        consumed: u64,
    },

    /// An unrecognized field cannot be skipped on a version 1 stream.
    #[error("cannot skip unrecognized field {0} on a version 1 stream")]
    CannotSkipField(String),

    /// A POD field block was written by a different field schema version.
    #[error("POD version mismatch for {name}: expected {expected}, found {found}")]
    PodVersionMismatch {
        /// The field's name.
        name: String,
        /// The version this build serializes.
        expected: u8,
        /// The version found in the stream.
        found: u8,
    },

    /// A field block's payload exceeds the 32-bit size prefix.
    #[error("field block too large: {0}")]
    FieldBlockTooLarge(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}
