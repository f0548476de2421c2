use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Job and printer metadata for a single conversion call.
///
/// A ticket bundles everything the filter may consult while synthesizing the
/// page descriptor: the command-line options of the job, the attributes of
/// the destination queue (typically loaded from its PPD file), and an
/// optional override for the rendering engine executable.
#[derive(Debug, Clone)]
pub struct JobTicket {
    /// Name of the destination printer queue.
    pub printer: String,
    /// Numeric job identifier, used for diagnostics only.
    pub job_id: u32,
    /// User that submitted the job.
    pub user: String,
    /// Human-readable job title.
    pub title: String,
    /// Copy count requested when the job was submitted.
    pub copies: u32,
    /// Job options as name/value pairs.
    pub options: BTreeMap<String, String>,
    /// Printer attributes as name/value pairs.
    pub printer_attrs: BTreeMap<String, String>,
    /// Explicit path to the rendering engine, overriding `MUPDF_BIN` and the
    /// `mutool` fallback.
    pub renderer: Option<PathBuf>,
}

impl Default for JobTicket {
    fn default() -> Self {
        Self {
            printer: String::new(),
            job_id: 0,
            user: String::new(),
            title: String::new(),
            copies: 1,
            options: BTreeMap::new(),
            printer_attrs: BTreeMap::new(),
            renderer: None,
        }
    }
}

/// Result of the color-calibration probe for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCalibration {
    /// The job runs in calibration mode; all color management is bypassed.
    Enabled,
    /// Normal printing.
    Disabled,
}

impl JobTicket {
    /// Look up a job option by name, case-insensitively.
    pub fn option(&self, name: &str) -> Option<&str> {
        lookup(&self.options, name)
    }

    /// Look up a printer attribute by name, case-insensitively. Absent
    /// attributes are not an error; every caller has a documented default.
    pub fn attr(&self, name: &str) -> Option<&str> {
        lookup(&self.printer_attrs, name)
    }

    /// Resolve the rendering engine executable: the explicit override on the
    /// ticket, then the `MUPDF_BIN` environment variable, then `mutool` from
    /// `PATH`.
    pub fn renderer_program(&self) -> PathBuf {
        self.renderer
            .clone()
            .or_else(|| env::var_os("MUPDF_BIN").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("mutool"))
    }

    /// Resolve the rendering intent for the job. The value is an opaque tag
    /// passed through to the raster header, never interpreted here.
    pub fn rendering_intent(&self) -> String {
        self.option("print-rendering-intent")
            .or_else(|| self.attr("DefaultRenderingIntent"))
            .unwrap_or("auto")
            .to_string()
    }

    /// Whether the job was submitted with the `cm-calibration` option.
    pub fn color_calibration(&self) -> ColorCalibration {
        match self.option("cm-calibration") {
            Some(value) if !is_false(value) => ColorCalibration::Enabled,
            _ => ColorCalibration::Disabled,
        }
    }

    /// Whether color management has been switched off for the whole queue.
    pub fn color_management_disabled(&self) -> bool {
        self.attr("ColorManagement").is_some_and(|value| {
            value.eq_ignore_ascii_case("off") || value.eq_ignore_ascii_case("disabled")
        })
    }

    /// The queue's ICC profile, if one is configured. The filter only holds
    /// the handle for the duration of the call; the engine does its own
    /// color handling.
    pub fn icc_profile(&self) -> Option<PathBuf> {
        self.attr("cupsICCProfile").map(PathBuf::from)
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn is_false(value: &str) -> bool {
    value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("no")
}

/// Parse a CUPS command-line option string into a map.
///
/// Options are whitespace-separated. `name=value` pairs are stored as given;
/// a bare `name` is stored as `true`; a bare `noname` stores `name` as
/// `false`, matching how CUPS treats boolean options on the command line.
pub fn parse_options(raw: &str) -> BTreeMap<String, String> {
    let mut options = BTreeMap::new();
    for token in raw.split_whitespace() {
        if let Some((name, value)) = token.split_once('=') {
            if !name.is_empty() {
                options.insert(name.to_string(), value.to_string());
            }
        } else if let Some(name) = strip_no_prefix(token) {
            options.insert(name.to_string(), "false".to_string());
        } else {
            options.insert(token.to_string(), "true".to_string());
        }
    }
    options
}

fn strip_no_prefix(token: &str) -> Option<&str> {
    match token.as_bytes() {
        [b'n' | b'N', b'o' | b'O', rest @ ..] if !rest.is_empty() => Some(&token[2..]),
        _ => None,
    }
}

/// Load printer attributes from a PPD file.
///
/// Only the `*Keyword: value` shape is consumed: the leading `*` is dropped,
/// the keyword is cut at the first space or `/` (translation strings), and
/// surrounding quotes are stripped from the value. Comment lines (`*%`) and
/// anything else are skipped. The first occurrence of a keyword wins, like
/// `ppdFindAttr`.
pub fn load_ppd(path: &Path) -> io::Result<BTreeMap<String, String>> {
    let text = fs::read_to_string(path)?;
    let mut attrs = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('*') else {
            continue;
        };
        if rest.starts_with('%') {
            continue;
        }
        let Some((keyword, value)) = rest.split_once(':') else {
            continue;
        };
        let keyword = keyword
            .split(|c| c == ' ' || c == '/')
            .next()
            .unwrap_or("")
            .trim();
        if keyword.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"').trim();
        attrs
            .entry(keyword.to_string())
            .or_insert_with(|| value.to_string());
    }
    Ok(attrs)
}
