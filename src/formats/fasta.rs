//! FASTA alignment reader and writer.
//!
//! ## FASTA Format
//!
//! ```text
//! >sequence_identifier optional description
//! ACGTACGTACGT...
//! >another_sequence
//! TGCATGCATGCA...
//! ```
//!
//! Every record of an alignment must resolve to the same length. Sequence
//! lines are copied byte for byte up to the first control character, so line
//! breaks inside a record are free.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::label::{check_writable_labels, register_label};
use super::{check_label_count, FileFormat, MsaError, MsaResult};
use crate::model::{AlignmentMatrix, LabelRegistry, MatrixBuffer, ParsedAlignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingHeader,
    ReadingSequence,
}

fn format_error(line: usize) -> MsaError {
    MsaError::Format {
        format: FileFormat::Fasta,
        line,
    }
}

/// Bytes of a sequence line, up to the first control character.
fn residues(line: &[u8]) -> &[u8] {
    let end = line.iter().position(|&b| b < 32).unwrap_or(line.len());
    &line[..end]
}

/// Parses a FASTA alignment from a reader into `buffer`.
///
/// Fails with `MsaError::Format` when a record's length differs from the
/// first record's; the error carries the line of the header that closed the
/// offending record, or the last line of input for the final record.
pub fn parse_fasta<R: BufRead>(mut reader: R, mut buffer: MatrixBuffer) -> MsaResult<ParsedAlignment> {
    let mut labels: Vec<Option<String>> = Vec::new();
    let mut registry = LabelRegistry::new();
    let mut parsed_count = 0;

    let mut state = State::SeekingHeader;
    let mut seqlen: Option<usize> = None;
    let mut curlen = 0;
    let mut line_number = 0;
    let mut line: Vec<u8> = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_number += 1;

        if let Some(header) = line.strip_prefix(b">") {
            if state == State::ReadingSequence {
                match seqlen {
                    Some(len) if len != curlen => return Err(format_error(line_number)),
                    Some(_) => {}
                    None => seqlen = Some(curlen),
                }
            }
            if register_label(header, &mut labels, &mut registry) {
                parsed_count += 1;
            }
            curlen = 0;
            state = State::ReadingSequence;
        } else {
            let data = residues(&line);
            if data.is_empty() {
                continue;
            }
            if state == State::SeekingHeader {
                // sequence before the first header
                return Err(format_error(line_number));
            }
            buffer.extend_from_slice(data)?;
            curlen += data.len();
        }
    }

    if state == State::SeekingHeader {
        return Err(MsaError::EmptyAlignment);
    }
    let seqlen = match seqlen {
        Some(len) if len != curlen => return Err(format_error(line_number)),
        Some(len) => len,
        None => curlen,
    };
    if seqlen == 0 {
        return Err(MsaError::EmptyAlignment);
    }

    let written = buffer.len();
    let matrix = buffer
        .into_matrix(seqlen)
        .ok_or_else(|| format_error(line_number))?;
    debug!(
        "FASTA: {} bytes written, shape {}x{}, {} labels registered",
        written,
        matrix.rows(),
        matrix.columns(),
        parsed_count
    );

    Ok(ParsedAlignment {
        matrix,
        labels,
        registry,
        parsed_count,
    })
}

/// Parses a FASTA alignment file into `buffer`.
///
/// # Examples
///
/// ```no_run
/// use msaio::formats::fasta::parse_fasta_file;
/// use msaio::model::MatrixBuffer;
///
/// let buffer = MatrixBuffer::for_file("aln.fasta").unwrap();
/// let alignment = parse_fasta_file("aln.fasta", buffer).unwrap();
/// println!("{} x {}", alignment.sequence_count(), alignment.alignment_length());
/// ```
pub fn parse_fasta_file<P: AsRef<Path>>(path: P, buffer: MatrixBuffer) -> MsaResult<ParsedAlignment> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MsaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fasta(std::io::BufReader::new(file), buffer).map_err(|e| e.with_path(path))
}

/// Parses FASTA content from a string, with a buffer sized to the content.
///
/// Useful for testing or processing in-memory data.
pub fn parse_fasta_str(content: &str) -> MsaResult<ParsedAlignment> {
    parse_fasta(content.as_bytes(), MatrixBuffer::with_capacity(content.len()))
}

/// Preconditions of the FASTA writers, checked before any output.
fn check_output<S: AsRef<str>>(
    labels: &[S],
    matrix: &AlignmentMatrix,
    line_length: usize,
) -> MsaResult<()> {
    check_label_count(labels, matrix)?;
    if line_length == 0 {
        return Err(MsaError::InvalidLineLength);
    }
    check_writable_labels(labels, FileFormat::Fasta)
}

/// Writes an alignment as FASTA, wrapping sequences every `line_length` bytes.
///
/// Nothing is written if the label count differs from the row count, if
/// `line_length` is zero, or if a label holds a line break.
pub fn write_fasta<W: Write, S: AsRef<str>>(
    writer: &mut W,
    labels: &[S],
    matrix: &AlignmentMatrix,
    line_length: usize,
) -> MsaResult<()> {
    check_output(labels, matrix, line_length)?;

    for (label, row) in labels.iter().zip(matrix.iter_rows()) {
        writeln!(writer, ">{}", label.as_ref())?;
        for chunk in row.chunks(line_length) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Writes an alignment to a FASTA file and returns its path.
pub fn write_fasta_file<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    labels: &[S],
    matrix: &AlignmentMatrix,
    line_length: usize,
) -> MsaResult<PathBuf> {
    let path = path.as_ref();
    // fail before the file is created
    check_output(labels, matrix, line_length)?;

    let io_error = |source| MsaError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    write_fasta(&mut writer, labels, matrix, line_length).map_err(|e| e.with_path(path))?;
    writer.flush().map_err(io_error)?;

    info!("wrote {} sequences to {}", matrix.rows(), path.display());
    Ok(path.to_path_buf())
}
