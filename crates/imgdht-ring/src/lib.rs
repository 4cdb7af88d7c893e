//! # imgdht-ring
//!
//! Identifier arithmetic, local object index and finger-table bookkeeping for
//! the imgdht Chord-style image DHT. This crate has no networking in it: it
//! is pure ring math plus the data the node engine needs to answer "is this
//! mine" and "who do I ask next".
//!
//! ## Modules
//!
//! - [`id`] — the 8-bit ring, `in_range`, and the shared SHA-1 digest/ID
//!   reduction used for both node IDs and object IDs.
//! - [`bloom`] — the 64-bit, 3-projection Bloom filter over object digests.
//! - [`index`] — the local object index: table + Bloom filter + reload.
//! - [`fingers`] — the finger table and its `fixup`/`fixdn` maintenance rules.
//! - [`blobstore`] — the out-of-scope image storage boundary, as a trait.

pub mod blobstore;
pub mod bloom;
pub mod fingers;
pub mod id;
pub mod index;

/// Errors surfaced by ring arithmetic, the local index, and the blob store.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// The manifest file could not be opened. Fatal at boot (spec §4.2).
    #[error("failed to open manifest {path}: {source}")]
    ManifestOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A manifest line exceeded the maximum filename length.
    #[error("filename on line {line} exceeds maximum length of {max} bytes")]
    FilenameTooLong { line: usize, max: usize },

    /// A blob store failed to resolve or read an image.
    #[error("failed to read image {name}: {source}")]
    ImageOpen {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A blob store read a file too short to contain a valid TGA header.
    #[error("image {name} is shorter than the 18-byte TGA header")]
    ImageTruncated { name: String },
}

/// Convenience result type for this crate.
pub type Result<T> = std::result::Result<T, RingError>;
