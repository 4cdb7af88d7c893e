//! The out-of-scope on-screen display path (spec §1): a trait boundary so
//! the client core doesn't depend on a GUI toolkit, grounded on the same
//! "specify external collaborators by interface" pattern as
//! `imgdht_ring::blobstore::BlobStore`.

use imgdht_ring::blobstore::ImageMeta;
use std::path::{Path, PathBuf};

/// Where a client hands off a successfully retrieved image.
pub trait DisplaySink {
    fn show(&self, name: &str, meta: &ImageMeta, bytes: &[u8]) -> std::io::Result<()>;
    fn not_found(&self, name: &str);
}

/// The bundled implementation: write the raw bytes to a file and print a
/// one-line summary (spec Glossary: "DisplaySink").
pub struct FileDisplaySink {
    output: PathBuf,
}

impl FileDisplaySink {
    pub fn new(output: PathBuf) -> Self {
        Self { output }
    }
}

impl DisplaySink for FileDisplaySink {
    fn show(&self, name: &str, meta: &ImageMeta, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::write(&self.output, bytes)?;
        println!(
            "{name}: {}x{} depth={} format={:?} -> {}",
            meta.width,
            meta.height,
            meta.depth,
            meta.format,
            self.output.display()
        );
        Ok(())
    }

    fn not_found(&self, name: &str) {
        println!("{name}: not found");
    }
}

impl std::fmt::Debug for dyn DisplaySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<DisplaySink>")
    }
}

pub fn default_output_path(requested: Option<PathBuf>, name: &str) -> PathBuf {
    requested.unwrap_or_else(|| Path::new(name).to_path_buf())
}
