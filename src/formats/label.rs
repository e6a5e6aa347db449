//! Record label scanning.
//!
//! A label runs from the start of the field to the first control byte.
//! Labels such as `O83071/192-246` carry a `/start-end` region suffix; the
//! suffix is kept in the stored label but dropped from the registry key, so
//! that several regions of one sequence group under the same identifier.

use super::{FileFormat, MsaError, MsaResult};
use crate::model::LabelRegistry;

/// Control byte that label scanning treats as printable.
pub const LABEL_SENTINEL: u8 = 0x14;

/// A label located inside a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedLabel<'a> {
    /// Full label text, region suffix included
    pub text: &'a [u8],
    /// Length of the registry key prefix of `text`
    pub key_len: usize,
}

impl<'a> ScannedLabel<'a> {
    /// The registry key: `text` without its region suffix.
    pub fn key(&self) -> &'a [u8] {
        &self.text[..self.key_len]
    }
}

/// Scans a label from the start of `field`.
pub fn scan_label(field: &[u8]) -> ScannedLabel<'_> {
    let mut slash: Option<usize> = None;
    let mut dash: Option<usize> = None;
    let mut end = field.len();

    for (i, &ch) in field.iter().enumerate() {
        if ch < 32 && ch != LABEL_SENTINEL {
            end = i;
            break;
        }
        match ch {
            // a leading slash is part of the name
            b'/' if i > 0 && slash.is_none() && dash.is_none() => slash = Some(i),
            b'-' if slash.is_some() && dash.is_none() => dash = Some(i),
            _ => {}
        }
    }

    let key_len = match (slash, dash) {
        (Some(s), Some(d)) if d > s => s,
        _ => end,
    };
    ScannedLabel {
        text: &field[..end],
        key_len,
    }
}

/// Appends the label found in `field` and registers it under its key.
///
/// The label's row index is its position in `labels`. Text that is not valid
/// UTF-8 leaves a `None` placeholder so rows and labels stay aligned, and is
/// not registered. Returns true when the label was registered.
pub fn register_label(
    field: &[u8],
    labels: &mut Vec<Option<String>>,
    registry: &mut LabelRegistry,
) -> bool {
    let scanned = scan_label(field);
    let index = labels.len();

    match std::str::from_utf8(scanned.text) {
        Ok(text) => {
            // the key ends at an ASCII '/', always a char boundary
            registry.insert(&text[..scanned.key_len], index);
            labels.push(Some(text.to_string()));
            true
        }
        Err(_) => {
            labels.push(None);
            false
        }
    }
}

/// Checks that every label survives a write and read back in `format`.
///
/// Control bytes other than the sentinel would end the label early. In the
/// fixed-column formats a space would end the label field, and a leading `#`,
/// `/` or `%` would turn the row into markup.
pub(crate) fn check_writable_labels<S: AsRef<str>>(
    labels: &[S],
    format: FileFormat,
) -> MsaResult<()> {
    let fixed_columns = format != FileFormat::Fasta;
    let writable = |label: &str| {
        let bytes = label.as_bytes();
        let breaks_line = bytes.iter().any(|&b| b < 32 && b != LABEL_SENTINEL);
        let breaks_columns = fixed_columns
            && (bytes.contains(&b' ') || matches!(bytes.first(), Some(b'#' | b'/' | b'%')));
        !breaks_line && !breaks_columns
    };

    for label in labels {
        let label = label.as_ref();
        if !writable(label) {
            return Err(MsaError::InvalidLabel {
                label: label.to_string(),
                format,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stops_at_control_byte() {
        let scanned = scan_label(b"seq1 description\r\n");
        assert_eq!(scanned.text, b"seq1 description");
        assert_eq!(scanned.key(), b"seq1 description");
    }

    #[test]
    fn test_scan_strips_region_suffix_from_key() {
        let scanned = scan_label(b"O83071/192-246\n");
        assert_eq!(scanned.text, b"O83071/192-246");
        assert_eq!(scanned.key(), b"O83071");
    }

    #[test]
    fn test_dash_before_slash_is_ignored() {
        let scanned = scan_label(b"a-b/1-5");
        assert_eq!(scanned.key(), b"a-b");
    }

    #[test]
    fn test_slash_without_dash_keeps_full_key() {
        let scanned = scan_label(b"path/name");
        assert_eq!(scanned.key(), b"path/name");
    }

    #[test]
    fn test_only_first_slash_counts() {
        let scanned = scan_label(b"a/b/3-9");
        assert_eq!(scanned.key(), b"a");
    }

    #[test]
    fn test_leading_slash_is_not_a_marker() {
        let scanned = scan_label(b"/x/1-4");
        assert_eq!(scanned.key(), b"/x");
    }

    #[test]
    fn test_sentinel_byte_is_printable() {
        let scanned = scan_label(b"ab\x14cd\n");
        assert_eq!(scanned.text, b"ab\x14cd");
    }

    #[test]
    fn test_register_label_counts_and_placeholders() {
        let mut labels = Vec::new();
        let mut registry = LabelRegistry::new();

        assert!(register_label(b"seqA/1-10\n", &mut labels, &mut registry));
        assert!(!register_label(b"bad\xff\n", &mut labels, &mut registry));
        assert!(register_label(b"seqA/20-30\n", &mut labels, &mut registry));

        assert_eq!(
            labels,
            vec![
                Some("seqA/1-10".to_string()),
                None,
                Some("seqA/20-30".to_string())
            ]
        );
        assert_eq!(registry.get("seqA"), Some(&[0, 2][..]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fasta_labels_may_hold_spaces_not_line_breaks() {
        let labels = ["seq1 some description", "a\x14b"];
        assert!(check_writable_labels(&labels, FileFormat::Fasta).is_ok());
        assert!(matches!(
            check_writable_labels(&["ok", "two\nlines"], FileFormat::Fasta),
            Err(MsaError::InvalidLabel { format: FileFormat::Fasta, .. })
        ));
    }

    #[test]
    fn test_column_labels_reject_spaces_and_markup() {
        assert!(check_writable_labels(&["O83071/192-246", ""], FileFormat::Selex).is_ok());
        for bad in ["seq1 desc", "#seq", "/seq", "%seq", "tab\tbed"] {
            match check_writable_labels(&[bad], FileFormat::Stockholm) {
                Err(MsaError::InvalidLabel { label, format }) => {
                    assert_eq!(label, bad);
                    assert_eq!(format, FileFormat::Stockholm);
                }
                other => panic!("{bad:?} accepted: {other:?}"),
            }
        }
    }
}
