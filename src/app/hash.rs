//! Streaming file digests for download reconciliation
//!
//! Files are hashed in fixed-size chunks so reconciling a multi-gigabyte
//! video never loads it into memory. The digest is integrity-only - it
//! decides whether two files carry the same bytes, nothing more - so a fast
//! non-adversarial checksum is the right tool.

use std::io;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::constants::files;

/// Compute the digest of a file, reading it in fixed-size chunks
pub async fn file_digest(path: &Path) -> io::Result<md5::Digest> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; files::CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }

    Ok(context.compute())
}

/// Compare two files by streaming digest.
///
/// Digest equality is treated as file identity; the checksum's distribution
/// makes accidental collisions a non-concern for this domain.
pub async fn files_match(a: &Path, b: &Path) -> io::Result<bool> {
    let digest_a = file_digest(a).await?;
    let digest_b = file_digest(b).await?;

    debug!(
        "Compared {} ({:x}) against {} ({:x})",
        a.display(),
        digest_a,
        b.display(),
        digest_b
    );

    Ok(digest_a == digest_b)
}
