//! SELEX and Stockholm alignment reader and writer.
//!
//! ## SELEX Format
//!
//! One sequence per line, label and sequence in fixed columns:
//! ```text
//! # comment
//! O83071/192-246     MTCRAQLIAVPRASSLAE..AIACAQKM
//! O31698/18-71       EVMLTDIPRLHINDPIMK..GFGMVINN
//! ```
//!
//! Stockholm wraps the same body between a `# STOCKHOLM 1.0` header and a
//! `//` terminator. Lines starting with `#`, `/` or `%` are markup and are
//! skipped, as are blank lines.
//!
//! The column geometry (where the sequence starts and ends) is read from the
//! first data line and holds for the whole file.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::label::{check_writable_labels, register_label};
use super::{check_label_count, FileFormat, MsaError, MsaResult};
use crate::model::{AlignmentMatrix, LabelRegistry, MatrixBuffer, ParsedAlignment};

/// First line of a Stockholm file.
pub const STOCKHOLM_HEADER: &str = "# STOCKHOLM 1.0";

/// Last line of a Stockholm alignment.
pub const STOCKHOLM_FOOTER: &str = "//";

/// Line reader with a one-line pushback.
struct LineScanner<R> {
    reader: R,
    line: Vec<u8>,
    line_number: usize,
    replay: bool,
}

impl<R: BufRead> LineScanner<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
            replay: false,
        }
    }

    /// Next line and its 1-based number, or `None` at end of input.
    fn next_line(&mut self) -> MsaResult<Option<(usize, &[u8])>> {
        if self.replay {
            self.replay = false;
        } else {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
        }
        Ok(Some((self.line_number, &self.line)))
    }

    /// Makes the next call return the current line again.
    fn unread(&mut self) {
        self.replay = true;
    }

    fn line_number(&self) -> usize {
        self.line_number
    }
}

fn is_markup(line: &[u8]) -> bool {
    matches!(line.first(), Some(b'#' | b'/' | b'%')) || line.iter().all(u8::is_ascii_whitespace)
}

/// Where the sequence column sits in every data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    beg: usize,
    end: usize,
}

impl Geometry {
    /// Reads the geometry off a data line: the sequence starts at the first
    /// non-space after the first space and ends at the line break.
    fn discover(line: &[u8]) -> Option<Self> {
        let space = line.iter().position(|&b| b == b' ')?;
        let beg = space + line[space..].iter().position(|&b| b != b' ')?;
        let end = beg
            + line[beg..]
                .iter()
                .position(|&b| b < 32)
                .unwrap_or(line.len() - beg);
        if end == beg {
            return None;
        }
        Some(Self { beg, end })
    }

    fn seqlen(&self) -> usize {
        self.end - self.beg
    }

    /// Splits a data line into its label field and sequence.
    ///
    /// The sequence is `[beg, end)` as read, spaces included. Returns `None`
    /// if the line does not follow the geometry: no space just before the
    /// sequence column, a line break inside it, or residues past its end.
    fn split<'a>(&self, line: &'a [u8]) -> Option<(&'a [u8], &'a [u8])> {
        if line.get(self.beg - 1) != Some(&b' ') {
            return None;
        }
        let sequence = line.get(self.beg..self.end)?;
        if sequence.iter().any(|&b| b < 32) {
            return None;
        }
        let rest = &line[self.end..];
        let tail = rest.iter().position(|&b| b < 32).unwrap_or(rest.len());
        if rest[..tail].iter().any(|&b| b != b' ') {
            return None;
        }

        let field = &line[..self.beg - 1];
        let label_len = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        Some((&field[..label_len], sequence))
    }
}

/// Parses a SELEX or Stockholm alignment from a reader into `buffer`.
///
/// Fails with `MsaError::Format` at the first data line that does not match
/// the column geometry of the first one. Labels are stored without the
/// trailing spaces that pad the label field.
pub fn parse_selex<R: BufRead>(reader: R, mut buffer: MatrixBuffer) -> MsaResult<ParsedAlignment> {
    let mut scanner = LineScanner::new(reader);
    let mut format = FileFormat::Selex;

    let geometry = loop {
        let Some((line_number, line)) = scanner.next_line()? else {
            return Err(MsaError::EmptyAlignment);
        };
        if line.starts_with(STOCKHOLM_HEADER.as_bytes()) {
            format = FileFormat::Stockholm;
        }
        if is_markup(line) {
            continue;
        }
        break Geometry::discover(line).ok_or(MsaError::Format {
            format,
            line: line_number,
        })?;
    };
    debug!(
        "{} geometry: sequence in columns {}..{} ({} residues)",
        format,
        geometry.beg,
        geometry.end,
        geometry.seqlen()
    );
    scanner.unread();

    let mut labels: Vec<Option<String>> = Vec::new();
    let mut registry = LabelRegistry::new();
    let mut parsed_count = 0;

    while let Some((line_number, line)) = scanner.next_line()? {
        if is_markup(line) {
            continue;
        }
        let (label, sequence) = geometry.split(line).ok_or(MsaError::Format {
            format,
            line: line_number,
        })?;
        if register_label(label, &mut labels, &mut registry) {
            parsed_count += 1;
        }
        buffer.extend_from_slice(sequence)?;
    }

    let matrix = buffer
        .into_matrix(geometry.seqlen())
        .ok_or(MsaError::Format {
            format,
            line: scanner.line_number(),
        })?;
    debug!(
        "{}: shape {}x{}, {} labels registered",
        format,
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

/// Parses a SELEX or Stockholm alignment file into `buffer`.
pub fn parse_selex_file<P: AsRef<Path>>(path: P, buffer: MatrixBuffer) -> MsaResult<ParsedAlignment> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MsaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_selex(BufReader::new(file), buffer).map_err(|e| e.with_path(path))
}

/// Parses SELEX or Stockholm content from a string.
pub fn parse_selex_str(content: &str) -> MsaResult<ParsedAlignment> {
    parse_selex(content.as_bytes(), MatrixBuffer::with_capacity(content.len()))
}

/// Preconditions of the SELEX writers, checked before any output.
///
/// Every label must be a single word that leaves at least one padding space
/// in its field, so that the output reads back with the same geometry.
fn check_output<S: AsRef<str>>(
    labels: &[S],
    matrix: &AlignmentMatrix,
    stockholm: bool,
    label_width: usize,
) -> MsaResult<()> {
    check_label_count(labels, matrix)?;
    let format = if stockholm {
        FileFormat::Stockholm
    } else {
        FileFormat::Selex
    };
    check_writable_labels(labels, format)?;
    match labels.iter().find(|l| l.as_ref().len() >= label_width) {
        Some(label) => Err(MsaError::LabelTooLong {
            label: label.as_ref().to_string(),
            width: label_width,
        }),
        None => Ok(()),
    }
}

/// Writes an alignment in SELEX format, or Stockholm if `stockholm` is set.
///
/// Each label is left-justified in a `label_width` field, directly followed
/// by the sequence. Nothing is written if the label count differs from the
/// row count, or if a label does not fit its field or holds a space.
pub fn write_selex<W: Write, S: AsRef<str>>(
    writer: &mut W,
    labels: &[S],
    matrix: &AlignmentMatrix,
    stockholm: bool,
    label_width: usize,
) -> MsaResult<()> {
    check_output(labels, matrix, stockholm, label_width)?;

    if stockholm {
        writeln!(writer, "{}", STOCKHOLM_HEADER)?;
    }
    let padding = vec![b' '; label_width];
    for (label, row) in labels.iter().zip(matrix.iter_rows()) {
        let label = label.as_ref().as_bytes();
        writer.write_all(label)?;
        writer.write_all(&padding[label.len()..])?;
        writer.write_all(row)?;
        writer.write_all(b"\n")?;
    }
    if stockholm {
        writeln!(writer, "{}", STOCKHOLM_FOOTER)?;
    }
    Ok(())
}

/// Writes an alignment to a SELEX or Stockholm file and returns its path.
pub fn write_selex_file<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    labels: &[S],
    matrix: &AlignmentMatrix,
    stockholm: bool,
    label_width: usize,
) -> MsaResult<PathBuf> {
    let path = path.as_ref();
    // fail before the file is created
    check_output(labels, matrix, stockholm, label_width)?;

    let io_error = |source| MsaError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    write_selex(&mut writer, labels, matrix, stockholm, label_width)
        .map_err(|e| e.with_path(path))?;
    writer.flush().map_err(io_error)?;

    info!("wrote {} sequences to {}", matrix.rows(), path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::DEFAULT_LABEL_WIDTH;
    use std::fs;

    const PF00571: &str = "\
# STOCKHOLM 1.0
#=GF ID   CBS
#=GS O83071/192-246 AC O83071

O83071/192-246      MTCRAQLIAVPRASSLAE..AIACAQKM
O31698/18-71        EVMLTDIPRLHINDPIMK..GFGMVINN
O31698/88-139       EVMLTDIPRLHINDPIMK..GFGMVIND
#=GC SS_cons        CCCHHHHHHHHHHHHHHH..EEEEEEEE
//
";

    #[test]
    fn test_parse_simple_selex() {
        let alignment = parse_selex_str("seq1      ACGT\nseq2      ACGG\n").unwrap();

        assert_eq!(alignment.matrix.shape(), (2, 4));
        assert_eq!(alignment.matrix.row(0).unwrap(), b"ACGT");
        assert_eq!(alignment.matrix.row(1).unwrap(), b"ACGG");
        assert_eq!(alignment.label_strs(), vec!["seq1", "seq2"]);
        assert_eq!(alignment.parsed_count, 2);
    }

    #[test]
    fn test_parse_stockholm() {
        let alignment = parse_selex_str(PF00571).unwrap();

        assert_eq!(alignment.matrix.shape(), (3, 28));
        assert_eq!(
            alignment.label_strs(),
            vec!["O83071/192-246", "O31698/18-71", "O31698/88-139"]
        );
        assert_eq!(
            alignment.matrix.row(2).unwrap(),
            b"EVMLTDIPRLHINDPIMK..GFGMVIND"
        );
        assert_eq!(alignment.registry.get("O83071"), Some(&[0][..]));
        assert_eq!(alignment.registry.get("O31698"), Some(&[1, 2][..]));
    }

    #[test]
    fn test_spaces_inside_sequence_column_are_residues() {
        let alignment = parse_selex_str("seq1  AC GT\nseq2  ACGGT\n").unwrap();

        assert_eq!(alignment.matrix.shape(), (2, 5));
        assert_eq!(alignment.matrix.row(0).unwrap(), b"AC GT");
        assert_eq!(alignment.matrix.row(1).unwrap(), b"ACGGT");
    }

    #[test]
    fn test_trailing_spaces_of_first_line_belong_to_geometry() {
        let alignment = parse_selex_str("a  AC-T  \r\nb  ACGT  \n").unwrap();
        assert_eq!(alignment.matrix.shape(), (2, 6));
        assert_eq!(alignment.matrix.row(1).unwrap(), b"ACGT  ");

        assert!(matches!(
            parse_selex_str("a  AC-T  \nb  ACGT\n"),
            Err(MsaError::Format { line: 2, .. })
        ));
    }

    #[test]
    fn test_fasta_row_with_space_survives_selex() {
        let fasta = crate::formats::fasta::parse_fasta_str(">a\nAC GT\n>b\nACGGT\n").unwrap();
        let mut out = Vec::new();
        write_selex(&mut out, &fasta.label_strs(), &fasta.matrix, false, DEFAULT_LABEL_WIDTH)
            .unwrap();

        let selex = parse_selex(&out[..], MatrixBuffer::with_capacity(out.len())).unwrap();
        assert_eq!(selex.matrix, fasta.matrix);
        assert_eq!(selex.labels, fasta.labels);
    }

    #[test]
    fn test_shift_left_is_format_error() {
        let content = "# comment\nseq1      ACGT\nseq2     ACGG\n";
        assert!(matches!(
            parse_selex_str(content),
            Err(MsaError::Format {
                format: FileFormat::Selex,
                line: 3
            })
        ));
    }

    #[test]
    fn test_shift_right_is_format_error() {
        let content = "seq1      ACGT\nseq2      ACGG\nseq3       ACGG\n";
        assert!(matches!(
            parse_selex_str(content),
            Err(MsaError::Format { line: 3, .. })
        ));
    }

    #[test]
    fn test_short_line_is_format_error() {
        let content = "seq1      ACGT\nseq2      AC\n";
        assert!(matches!(
            parse_selex_str(content),
            Err(MsaError::Format { line: 2, .. })
        ));
    }

    #[test]
    fn test_stockholm_errors_name_the_format() {
        let content = "# STOCKHOLM 1.0\nseq1  ACGT\nseq2 ACGT\n//\n";
        assert!(matches!(
            parse_selex_str(content),
            Err(MsaError::Format {
                format: FileFormat::Stockholm,
                line: 3
            })
        ));
    }

    #[test]
    fn test_line_without_sequence() {
        assert!(matches!(
            parse_selex_str("lonely\n"),
            Err(MsaError::Format { line: 1, .. })
        ));
        assert!(matches!(
            parse_selex_str("# c\nlabel    \n"),
            Err(MsaError::Format { line: 2, .. })
        ));
    }

    #[test]
    fn test_no_data_lines() {
        assert!(matches!(parse_selex_str(""), Err(MsaError::EmptyAlignment)));
        assert!(matches!(
            parse_selex_str("# STOCKHOLM 1.0\n//\n"),
            Err(MsaError::EmptyAlignment)
        ));
    }

    #[test]
    fn test_buffer_too_small() {
        let result = parse_selex(
            &b"a AAAA\nb CCCC\nc GGGG\n"[..],
            MatrixBuffer::for_shape(2, 4),
        );
        assert!(matches!(result, Err(MsaError::Capacity { capacity: 8 })));
    }

    #[test]
    fn test_write_selex_pads_labels() {
        let matrix = AlignmentMatrix::from_rows(&["AC-T", "ACGT"]).unwrap();
        let mut out = Vec::new();
        write_selex(&mut out, &["a", "bb"], &matrix, false, 4).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "a   AC-T\nbb  ACGT\n");
    }

    #[test]
    fn test_write_stockholm_framing() {
        let matrix = AlignmentMatrix::from_rows(&["AC-T", "ACGT"]).unwrap();
        let mut out = Vec::new();
        write_selex(&mut out, &["a", "bb"], &matrix, true, 4).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "# STOCKHOLM 1.0\na   AC-T\nbb  ACGT\n//\n"
        );
    }

    #[test]
    fn test_write_rejects_label_filling_field() {
        let matrix = AlignmentMatrix::from_rows(&["AC"]).unwrap();
        let mut out = Vec::new();
        match write_selex(&mut out, &["abcd"], &matrix, true, 4) {
            Err(MsaError::LabelTooLong { label, width }) => {
                assert_eq!(label, "abcd");
                assert_eq!(width, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_rejects_label_with_space() {
        let matrix = AlignmentMatrix::from_rows(&["ACGT", "ACGG"]).unwrap();
        let mut out = Vec::new();
        match write_selex(&mut out, &["seq1 desc", "seq2"], &matrix, false, 31) {
            Err(MsaError::InvalidLabel { label, format }) => {
                assert_eq!(label, "seq1 desc");
                assert_eq!(format, FileFormat::Selex);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_file_bad_label_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.sto");
        let matrix = AlignmentMatrix::from_rows(&["ACGT"]).unwrap();

        let result = write_selex_file(&output, &["#=GS"], &matrix, true, 31);
        assert!(matches!(
            result,
            Err(MsaError::InvalidLabel {
                format: FileFormat::Stockholm,
                ..
            })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_write_file_mismatch_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.slx");
        let matrix = AlignmentMatrix::from_rows(&["ACGT", "ACGG"]).unwrap();

        let result = write_selex_file(&output, &["a", "b", "c"], &matrix, false, 31);
        assert!(matches!(
            result,
            Err(MsaError::SizeMismatch { labels: 3, rows: 2 })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("PF00571.sto");
        fs::write(&input, PF00571).unwrap();

        let parsed = parse_selex_file(&input, MatrixBuffer::for_file(&input).unwrap()).unwrap();
        let output = dir.path().join("out.sto");
        write_selex_file(
            &output,
            &parsed.label_strs(),
            &parsed.matrix,
            true,
            DEFAULT_LABEL_WIDTH,
        )
        .unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let first_row = text.lines().nth(1).unwrap();
        assert_eq!(first_row.find('M'), Some(DEFAULT_LABEL_WIDTH));

        let reparsed = parse_selex_file(&output, MatrixBuffer::for_file(&output).unwrap()).unwrap();
        assert_eq!(reparsed.matrix, parsed.matrix);
        assert_eq!(reparsed.labels, parsed.labels);
        assert_eq!(reparsed.registry, parsed.registry);
    }
}
