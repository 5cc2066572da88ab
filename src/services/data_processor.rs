use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use calamine::{open_workbook_auto, Reader};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::{SolverError, SolverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFileKind {
    Pdf,
    Csv,
    Excel,
    Json,
    Text,
}

impl DataFileKind {
    /// Kind from the extension of the URL path, ignoring query and fragment.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let (_, extension) = file_name.rsplit_once('.')?;

        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DataFileKind::Pdf),
            "csv" => Some(DataFileKind::Csv),
            "xlsx" | "xls" => Some(DataFileKind::Excel),
            "json" => Some(DataFileKind::Json),
            "txt" => Some(DataFileKind::Text),
            _ => None,
        }
    }
}

/// Tables longer than this are cut to their first and last rows before they
/// reach the answer prompt. `row_count` always holds the full length.
pub const PREVIEW_MAX_ROWS: usize = 60;
pub const PREVIEW_EDGE_ROWS: usize = 5;
const ELIDED_ROW_MARKER: &str = "...";

/// Text of one PDF page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfPage {
    pub page_number: usize,
    pub text: String,
}

/// One worksheet. Field order puts the size ahead of the cells, so a
/// truncated serialization still carries it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetData {
    pub row_count: usize,
    pub rows: Vec<Vec<String>>,
}

/// Structured content of one data file, serialized into the answer prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessedData {
    Pdf {
        page_count: usize,
        pages: Vec<PdfPage>,
    },
    Table {
        headers: Vec<String>,
        row_count: usize,
        rows: Vec<Vec<String>>,
    },
    Workbook {
        sheets: BTreeMap<String, SheetData>,
    },
    Json {
        value: serde_json::Value,
    },
    Text {
        content: String,
    },
}

impl ProcessedData {
    /// Shortens long tables to head and tail rows with a `...` row between them.
    pub fn preview(self) -> Self {
        match self {
            ProcessedData::Table {
                headers,
                row_count,
                rows,
            } => ProcessedData::Table {
                headers,
                row_count,
                rows: edge_rows(rows),
            },
            ProcessedData::Workbook { sheets } => ProcessedData::Workbook {
                sheets: sheets
                    .into_iter()
                    .map(|(name, sheet)| {
                        let rows = edge_rows(sheet.rows);
                        (name, SheetData { row_count: sheet.row_count, rows })
                    })
                    .collect(),
            },
            other => other,
        }
    }
}

fn edge_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    if rows.len() <= PREVIEW_MAX_ROWS {
        return rows;
    }
    let tail = rows.split_off(rows.len() - PREVIEW_EDGE_ROWS);
    rows.truncate(PREVIEW_EDGE_ROWS);
    rows.push(vec![ELIDED_ROW_MARKER.to_string()]);
    rows.extend(tail);
    rows
}

fn file_error(path: &Path, reason: impl std::fmt::Display) -> SolverError {
    SolverError::data_file(&path.display().to_string(), reason)
}

/// Text per page. pdf-extract panics on some malformed documents, so a panic
/// is reported as a processing error like any other.
pub fn process_pdf(path: &Path) -> SolverResult<ProcessedData> {
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| file_error(path, "PDF parser panicked on malformed input"))?
        .map_err(|e| file_error(path, e))?;

    let pages = extracted
        .into_iter()
        .enumerate()
        .map(|(index, text)| PdfPage {
            page_number: index + 1,
            text: text.trim().to_string(),
        })
        .collect::<Vec<_>>();

    log::info!("Processed PDF {}: {} page(s)", path.display(), pages.len());
    Ok(ProcessedData::Pdf {
        page_count: pages.len(),
        pages,
    })
}

pub fn process_csv(path: &Path) -> SolverResult<ProcessedData> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| file_error(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| file_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| file_error(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    log::info!(
        "Processed CSV {}: {} rows, {} columns",
        path.display(),
        rows.len(),
        headers.len()
    );
    Ok(ProcessedData::Table {
        headers,
        row_count: rows.len(),
        rows,
    })
}

/// Every sheet of a workbook, cells rendered as text.
pub fn process_excel(path: &Path) -> SolverResult<ProcessedData> {
    let mut workbook = open_workbook_auto(path).map_err(|e| file_error(path, e))?;

    let mut sheets = BTreeMap::new();
    for name in workbook.sheet_names().to_owned() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| file_error(path, e))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect::<Vec<Vec<String>>>();
        log::info!("Processed Excel sheet '{}': {} rows", name, rows.len());
        sheets.insert(
            name,
            SheetData {
                row_count: rows.len(),
                rows,
            },
        );
    }

    Ok(ProcessedData::Workbook { sheets })
}

pub fn process_json(path: &Path) -> SolverResult<ProcessedData> {
    let raw = std::fs::read_to_string(path).map_err(|e| file_error(path, e))?;
    let value = serde_json::from_str(&raw).map_err(|e| file_error(path, e))?;
    Ok(ProcessedData::Json { value })
}

pub fn process_text(path: &Path) -> SolverResult<ProcessedData> {
    let bytes = std::fs::read(path).map_err(|e| file_error(path, e))?;
    Ok(ProcessedData::Text {
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

pub fn process_file(kind: DataFileKind, path: &Path) -> SolverResult<ProcessedData> {
    match kind {
        DataFileKind::Pdf => process_pdf(path),
        DataFileKind::Csv => process_csv(path),
        DataFileKind::Excel => process_excel(path),
        DataFileKind::Json => process_json(path),
        DataFileKind::Text => process_text(path),
    }
}

/// Local file name for a download: URL hash plus the original base name, so
/// two URLs with the same base name never collide.
pub fn local_file_name(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let base_name = path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("download");
    let base_name: String = base_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();

    format!("{}_{}", &digest[..16], base_name)
}

/// Fetches a data file into `work_dir` and turns it into [`ProcessedData`].
#[async_trait]
pub trait DataFileLoader: Send + Sync {
    async fn load(&self, url: &str, work_dir: &Path) -> SolverResult<ProcessedData>;
}

pub struct HttpDataFileLoader {
    client: reqwest::Client,
}

impl HttpDataFileLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, work_dir: &Path) -> SolverResult<PathBuf> {
        log::info!("Downloading data file: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SolverError::data_file(url, e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SolverError::data_file(url, e))?;

        let path = work_dir.join(local_file_name(url));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SolverError::data_file(url, e))?;

        log::info!("Downloaded {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[async_trait]
impl DataFileLoader for HttpDataFileLoader {
    async fn load(&self, url: &str, work_dir: &Path) -> SolverResult<ProcessedData> {
        let kind = DataFileKind::from_url(url)
            .ok_or_else(|| SolverError::data_file(url, "unsupported file type"))?;
        let path = self.download(url, work_dir).await?;

        // PDF and spreadsheet parsing are CPU-bound and may panic on malformed input.
        tokio::task::spawn_blocking(move || process_file(kind, &path))
            .await
            .map_err(|e| SolverError::data_file(url, e))?
    }
}
