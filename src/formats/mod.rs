//! Multi-format alignment reader and writer.
//!
//! Supports:
//! - FASTA (.fasta, .fa, .fas, .fna, .faa)
//! - SELEX (.slx, .selex)
//! - Stockholm (.sto, .sth, .stk, .stockholm)
//!
//! Format detection priority when reading:
//! 1. Explicit format specification (-f option)
//! 2. File extension
//! 3. Content-based detection

pub mod fasta;
pub mod label;
pub mod selex;

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::model::{AlignmentMatrix, MatrixBuffer, ParsedAlignment};

/// Default FASTA line wrap width.
pub const DEFAULT_LINE_LENGTH: usize = 60;

/// Default SELEX/Stockholm label field width.
pub const DEFAULT_LABEL_WIDTH: usize = 31;

/// Alignment file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Fasta,
    Selex,
    Stockholm,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Fasta => write!(f, "FASTA"),
            FileFormat::Selex => write!(f, "SELEX"),
            FileFormat::Stockholm => write!(f, "Stockholm"),
        }
    }
}

/// Errors raised while reading or writing alignments.
///
/// Every error aborts the whole operation; no partial result is returned.
#[derive(Error, Debug)]
pub enum MsaError {
    #[error("failed to parse {format} file at line {line}")]
    Format { format: FileFormat, line: usize },

    #[error("size of labels and msa array does not match ({labels} labels, {rows} rows)")]
    SizeMismatch { labels: usize, rows: usize },

    #[error("alignment does not fit in output buffer of {capacity} bytes")]
    Capacity { capacity: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O failure on a reader or writer with no associated path.
    #[error("I/O error: {0}")]
    Stream(#[from] io::Error),

    #[error("No sequences found")]
    EmptyAlignment,

    #[error("Line length must be positive")]
    InvalidLineLength,

    #[error("Label '{label}' does not fit in a {width} character label field")]
    LabelTooLong { label: String, width: usize },

    #[error("Label {label:?} cannot be written as {format}")]
    InvalidLabel { label: String, format: FileFormat },

    #[error("Could not determine file format.\n\
             Hint: Use -f/--from to specify the format explicitly:\n  \
             msaio -f fasta <file>\n  \
             msaio -f selex <file>\n  \
             msaio -f stockholm <file>")]
    UnknownFormat,
}

impl MsaError {
    /// Attaches `path` to a pathless I/O error.
    pub fn with_path<P: AsRef<Path>>(self, path: P) -> Self {
        match self {
            MsaError::Stream(source) => MsaError::Io {
                path: path.as_ref().to_path_buf(),
                source,
            },
            other => other,
        }
    }
}

/// Result type for alignment I/O.
pub type MsaResult<T> = Result<T, MsaError>;

/// Output settings shared by the writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// FASTA residues per line
    pub line_length: usize,
    /// SELEX/Stockholm label field width
    pub label_width: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            line_length: DEFAULT_LINE_LENGTH,
            label_width: DEFAULT_LABEL_WIDTH,
        }
    }
}

/// Checks that there is exactly one label per matrix row.
pub(crate) fn check_label_count<S>(labels: &[S], matrix: &AlignmentMatrix) -> MsaResult<()> {
    if labels.len() != matrix.rows() {
        return Err(MsaError::SizeMismatch {
            labels: labels.len(),
            rows: matrix.rows(),
        });
    }
    Ok(())
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Detects format from file extension.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FileFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "fa" | "fas" | "fasta" | "fna" | "faa" => Some(FileFormat::Fasta),
        "slx" | "selex" => Some(FileFormat::Selex),
        "sto" | "sth" | "stk" | "stockholm" => Some(FileFormat::Stockholm),
        _ => None,
    }
}

/// Detects the file format by examining the content.
pub fn detect_format_from_content(content: &[u8]) -> Option<FileFormat> {
    for line in content.split(|&b| b == b'\n') {
        let trimmed = trim_ascii(line);
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with(selex::STOCKHOLM_HEADER.as_bytes()) {
            return Some(FileFormat::Stockholm);
        }
        if trimmed.starts_with(b">") {
            return Some(FileFormat::Fasta);
        }
        // SELEX comments
        if matches!(trimmed[0], b'#' | b'/' | b'%') {
            continue;
        }
        // SELEX data: a label, then a sequence column
        if trimmed.iter().any(|&b| b == b' ') {
            return Some(FileFormat::Selex);
        }
        return None;
    }

    None
}

/// Parses in-memory content with a specific format.
fn parse_content(
    content: &[u8],
    format: FileFormat,
    buffer: MatrixBuffer,
) -> MsaResult<ParsedAlignment> {
    match format {
        FileFormat::Fasta => fasta::parse_fasta(content, buffer),
        FileFormat::Selex | FileFormat::Stockholm => selex::parse_selex(content, buffer),
    }
}

/// Parses an alignment file with optional format specification.
///
/// The output buffer is sized to the file length. Returns the alignment
/// together with the format it was read as.
pub fn parse_file_with_options<P: AsRef<Path>>(
    path: P,
    forced_format: Option<FileFormat>,
) -> MsaResult<(ParsedAlignment, FileFormat)> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|source| MsaError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let format = forced_format
        .or_else(|| detect_format_from_extension(path))
        .or_else(|| detect_format_from_content(&content))
        .ok_or(MsaError::UnknownFormat)?;
    debug!("reading {} as {}", path.display(), format);

    let buffer = MatrixBuffer::with_capacity(content.len());
    let alignment = parse_content(&content, format, buffer).map_err(|e| e.with_path(path))?;
    info!(
        "read {} sequences of length {} from {}",
        alignment.sequence_count(),
        alignment.alignment_length(),
        path.display()
    );
    Ok((alignment, format))
}

/// Parses an alignment file, automatically detecting the format.
pub fn parse_file<P: AsRef<Path>>(path: P) -> MsaResult<ParsedAlignment> {
    parse_file_with_options(path, None).map(|(alignment, _)| alignment)
}

/// Writes labels and matrix to `path` in `format`.
pub fn write_file<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    format: FileFormat,
    labels: &[S],
    matrix: &AlignmentMatrix,
    options: &WriteOptions,
) -> MsaResult<PathBuf> {
    match format {
        FileFormat::Fasta => fasta::write_fasta_file(path, labels, matrix, options.line_length),
        FileFormat::Selex => {
            selex::write_selex_file(path, labels, matrix, false, options.label_width)
        }
        FileFormat::Stockholm => {
            selex::write_selex_file(path, labels, matrix, true, options.label_width)
        }
    }
}
