use crate::error::{AssistantError, Result};
use crate::extractor::PdfExtractor;
use crate::models::{IngestionReport, SkippedFile, UploadedFile};
use crate::store::DocumentStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub const MAX_UPLOAD_FILES: usize = 5;

pub fn check_upload_batch(count: usize) -> Result<()> {
    if count > MAX_UPLOAD_FILES {
        return Err(AssistantError::TooManyFiles {
            count,
            limit: MAX_UPLOAD_FILES,
        });
    }
    Ok(())
}

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Expands directories into the PDFs they contain and reads every file.
/// The batch cap is checked before any file is read.
pub fn read_upload_files(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut expanded = Vec::new();
    for path in paths {
        if path.is_dir() {
            expanded.extend(discover_pdf_files(path));
        } else {
            expanded.push(path.clone());
        }
    }

    check_upload_batch(expanded.len())?;

    expanded
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    AssistantError::InvalidArgument(format!(
                        "path has no file name: {}",
                        path.display()
                    ))
                })?
                .to_string();
            let bytes = fs::read(&path)?;
            Ok(UploadedFile { name, bytes })
        })
        .collect()
}

/// Best effort over extraction: a file whose text comes back empty is
/// skipped and the rest of the batch continues. Embedding or index failures
/// still abort.
pub async fn ingest_upload_batch(
    store: &DocumentStore,
    extractor: &dyn PdfExtractor,
    files: &[UploadedFile],
) -> Result<IngestionReport> {
    check_upload_batch(files.len())?;

    let mut report = IngestionReport::default();
    for file in files {
        let text = extractor.extract_text(&file.bytes);
        if text.trim().is_empty() {
            warn!(file = %file.name, "no text extracted, skipping");
            report.skipped_files.push(SkippedFile {
                name: file.name.clone(),
                reason: "no text could be extracted".to_string(),
            });
            continue;
        }

        report.chunks_added += store.add_document(&file.name, &text).await?;
        report.processed_files.push(file.name.clone());
    }

    Ok(report)
}
