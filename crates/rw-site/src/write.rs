//! Writing rendered files to disk.
//!
//! All writes of a batch run concurrently and share one cancellation token.
//! The first failing write trips the token; writes still in flight observe
//! it and finish as no-ops, so exactly one error comes out of a batch. Files
//! written before the failure stay on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::error::SiteError;
use crate::path::path_to_file_path;
use crate::route::BulkData;

/// Write every `(path, content)` pair under `out_dir`.
///
/// Returns the number of files written.
pub(crate) async fn write_files(
    out_dir: &Path,
    files: &BulkData<String>,
) -> Result<usize, SiteError> {
    let token = CancellationToken::new();
    let writes = files
        .iter()
        .map(|(path, content)| write_file(out_dir, path, content, &token));

    let results = join_all(writes).await;
    let written = results.len();
    results.into_iter().collect::<Result<Vec<()>, _>>()?;
    Ok(written)
}

/// Destination of the file rendered for `path`.
pub(crate) fn output_path(out_dir: &Path, path: &str) -> PathBuf {
    out_dir.join(path_to_file_path(path).trim_start_matches('/'))
}

async fn write_file(
    out_dir: &Path,
    path: &str,
    content: &str,
    token: &CancellationToken,
) -> Result<(), SiteError> {
    if token.is_cancelled() {
        return Ok(());
    }

    let file_path = output_path(out_dir, path);
    let result = tokio::select! {
        biased;
        () = token.cancelled() => return Ok(()),
        result = write_to_disk(&file_path, content) => result,
    };

    match result {
        Ok(()) => {
            tracing::debug!(path, file = %file_path.display(), "wrote file");
            Ok(())
        }
        // Another write failed first: this one was aborted, not failed.
        Err(_) if token.is_cancelled() => Ok(()),
        Err(source) => {
            token.cancel();
            tracing::error!(path, file = %file_path.display(), error = %source, "failed to write file");
            Err(SiteError::Write {
                path: file_path,
                source: Arc::new(source),
            })
        }
    }
}

async fn write_to_disk(file_path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = file_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(file_path, content).await
}
