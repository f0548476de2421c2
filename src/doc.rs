use std::io::{self, BufRead, Read, Seek, SeekFrom};

use crate::page::PageHeader;

/// Directive lines are only honored this close to the format marker. They
/// are injected by the upstream pdftopdf stage right after the header, so
/// scanning further would only ever find document data.
const MAX_COMMENT_LINES: usize = 20;

/// Longest chunk the directive scanner consumes per read. Lines beyond this
/// are processed in pieces, which cannot spuriously match a directive prefix
/// because the prefixes all sit at a chunk start.
const COMMENT_CHUNK: u64 = 4096;

/// What the staged input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    /// Starts with the PDF magic marker.
    Pdf,
    /// Zero bytes of input.
    Empty,
    /// Non-empty, but not a PDF.
    Unrecognized,
}

/// Identify the staged input by its leading bytes.
///
/// The stream is rewound first and left positioned just past the sniffed
/// prefix. An input shorter than the marker is classified `Unrecognized`
/// unless it is empty outright.
pub fn sniff<R: Read + Seek + ?Sized>(input: &mut R) -> io::Result<DocType> {
    input.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match input.read(&mut magic[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(if filled == 0 {
        DocType::Empty
    } else if filled == magic.len() && magic == *b"%PDF" {
        DocType::Pdf
    } else {
        DocType::Unrecognized
    })
}

/// Scan the document head for pdftopdf job-control directives.
///
/// Rewinds, skips to the line carrying the PDF magic marker, then inspects
/// at most `MAX_COMMENT_LINES` following lines for `%%PDFTOPDFNumCopies`
/// and `%%PDFTOPDFCollate` comments, overriding the descriptor's copy count
/// and collation when found. Malformed directive lines are ignored.
pub fn scan_inline_directives<R: BufRead + Seek + ?Sized>(
    input: &mut R,
    header: &mut PageHeader,
) -> io::Result<()> {
    input.seek(SeekFrom::Start(0))?;
    let mut line = Vec::new();
    loop {
        if read_chunk(input, &mut line)? == 0 {
            return Ok(());
        }
        if line.starts_with(b"%PDF") {
            break;
        }
    }
    for _ in 0..MAX_COMMENT_LINES {
        if read_chunk(input, &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        if let Some(rest) = text.strip_prefix("%%PDFTOPDFNumCopies") {
            if let Some((_, value)) = rest.split_once(':') {
                if let Some(copies) = leading_u32(value.trim_start()) {
                    if copies > 0 {
                        header.num_copies = copies;
                    }
                }
            }
        } else if let Some(rest) = text.strip_prefix("%%PDFTOPDFCollate") {
            if let Some((_, value)) = rest.split_once(':') {
                let value = value.trim_start_matches([' ', '\t']).as_bytes();
                header.collate = value.len() >= 4 && value[..4].eq_ignore_ascii_case(b"true");
            }
        }
    }
    Ok(())
}

fn read_chunk<R: BufRead + ?Sized>(input: &mut R, line: &mut Vec<u8>) -> io::Result<usize> {
    line.clear();
    (&mut *input).take(COMMENT_CHUNK).read_until(b'\n', line)
}

fn leading_u32(value: &str) -> Option<u32> {
    let rest = value.strip_prefix('+').unwrap_or(value);
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}
