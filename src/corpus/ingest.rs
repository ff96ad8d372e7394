//! Directory ingestion into a chunk store

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::corpus::chunker::chunk_text;
use crate::corpus::{ChunkOrigin, ChunkStore, EvidenceChunk};
use crate::errors::{PipelineError, Result};

/// File extensions picked up by ingestion
const INGESTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Files chunked and stored
    pub files: usize,
    /// Chunks stored
    pub chunks: usize,
    /// Files skipped (empty or unreadable)
    pub skipped: usize,
}

/// Chunk every text file under `dir` and store the chunks
pub async fn ingest_directory(
    dir: &Path,
    chunk_size: usize,
    chunk_overlap: usize,
    store: &dyn ChunkStore,
) -> Result<IngestReport> {
    if !dir.is_dir() {
        return Err(PipelineError::Configuration(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let ingested_at = chrono::Utc::now().to_rfc3339();
    let mut report = IngestReport::default();

    for path in files {
        let source_id = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %source_id, error = %e, "skipping unreadable file");
                report.skipped += 1;
                continue;
            }
        };

        if text.trim().is_empty() {
            debug!(file = %source_id, "skipping empty file");
            report.skipped += 1;
            continue;
        }

        let chunks: Vec<EvidenceChunk> = chunk_text(&text, chunk_size, chunk_overlap)
            .into_iter()
            .map(|c| {
                EvidenceChunk::new(c.text, ChunkOrigin::new(source_id.clone(), c.offset))
                    .with_metadata("file_name", file_name(&path))
                    .with_metadata("ingested_at", ingested_at.clone())
            })
            .collect();

        let stored = store.store(chunks).await?;
        info!(file = %source_id, chunks = stored, "ingested");

        report.files += 1;
        report.chunks += stored;
    }

    Ok(report)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if has_ingested_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_ingested_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            INGESTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
