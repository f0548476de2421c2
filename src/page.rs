use regex::Regex;

use crate::job::JobTicket;

/// Color spaces the raster header can ask the engine for.
///
/// The set mirrors the CUPS `ColorModel` vocabulary; the engine itself only
/// distinguishes four output modes, so several variants collapse onto the
/// same flag when the command line is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Device RGB.
    Rgb,
    /// Device CMY.
    Cmy,
    /// sRGB.
    Srgb,
    /// Adobe RGB.
    AdobeRgb,
    /// Device CMYK.
    Cmyk,
    /// Grayscale.
    Gray,
    /// Black only (bi-level).
    Black,
    /// White only (bi-level, inverted).
    White,
}

/// Output raster container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFlavor {
    /// PWG raster.
    Pwg,
    /// PCLm.
    Pclm,
}

impl RasterFlavor {
    /// Format name as the engine's `-F` flag expects it.
    pub fn format_name(self) -> &'static str {
        match self {
            RasterFlavor::Pwg => "pwg",
            RasterFlavor::Pclm => "pclm",
        }
    }
}

/// Unset resolution sentinel left behind when the job carries no usable
/// `Resolution` option. `resolve_default_resolution` replaces it before the
/// engine is invoked.
const UNSET_RESOLUTION: (u32, u32) = (100, 100);

/// Fallback when neither the job nor the queue names a resolution.
const FALLBACK_DPI: u32 = 300;

/// US Letter in points, the last-resort page size.
const LETTER: (u32, u32) = (612, 792);

/// Known page size names and their dimensions in points.
const PAGE_SIZES: &[(&str, (u32, u32))] = &[
    ("Letter", (612, 792)),
    ("Legal", (612, 1008)),
    ("Executive", (522, 756)),
    ("Tabloid", (792, 1224)),
    ("A3", (842, 1191)),
    ("A4", (595, 842)),
    ("A5", (420, 595)),
];

/// Page descriptor for one conversion.
///
/// This is the raster-geometry half of the job: everything the engine needs
/// to be told on its command line, plus the copy handling fields that inline
/// document directives may still override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    /// Page width in pixels at the selected resolution.
    pub width: u32,
    /// Page height in pixels at the selected resolution.
    pub height: u32,
    /// Horizontal and vertical resolution in dots per inch.
    pub resolution: (u32, u32),
    /// Page size in points (1/72 inch).
    pub page_size: (u32, u32),
    /// Color space requested for the output raster.
    pub color_space: ColorSpace,
    /// Rendering intent tag, passed through untouched.
    pub rendering_intent: String,
    /// Number of copies to produce.
    pub num_copies: u32,
    /// Whether copies are collated.
    pub collate: bool,
    /// Mirrored output. Upstream filters have already applied any mirroring,
    /// so this stays `false` here.
    pub mirror: bool,
    /// Page rotation in quarter turns. Same story as `mirror`.
    pub orientation: u32,
    /// Output container format.
    pub flavor: RasterFlavor,
}

impl PageHeader {
    /// Build a page descriptor from the job ticket.
    ///
    /// The resolution is taken from the `Resolution` option when it parses
    /// to two positive values; otherwise the unset sentinel is left in place
    /// for `resolve_default_resolution` to deal with. Page size and color
    /// space fall back from job options to queue attributes to fixed
    /// defaults.
    pub fn prepare(job: &JobTicket, flavor: RasterFlavor) -> PageHeader {
        let resolution = job
            .option("Resolution")
            .and_then(parse_resolution)
            .filter(|&(x, y)| x > 0 && y > 0)
            .unwrap_or(UNSET_RESOLUTION);
        let page_size = job
            .option("PageSize")
            .or_else(|| job.option("media"))
            .and_then(lookup_page_size)
            .or_else(|| job.attr("DefaultPageSize").and_then(lookup_page_size))
            .unwrap_or(LETTER);
        let color_space = job
            .option("ColorModel")
            .and_then(parse_color_model)
            .or_else(|| job.option("print-color-mode").and_then(parse_color_mode))
            .or_else(|| job.attr("DefaultColorModel").and_then(parse_color_model))
            .unwrap_or(ColorSpace::Srgb);
        let collate = job
            .option("Collate")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        let mut header = PageHeader {
            width: 0,
            height: 0,
            resolution,
            page_size,
            color_space,
            rendering_intent: job.rendering_intent(),
            num_copies: job.copies,
            collate,
            mirror: false,
            orientation: 0,
            flavor,
        };
        header.recompute_dimensions();
        header
    }

    /// Replace the unset resolution sentinel with the queue default.
    ///
    /// A job that named its own resolution is left alone. Otherwise the
    /// queue's `DefaultResolution` attribute is consulted, with 300 dpi
    /// standing in for a missing or unusable value, and a zero vertical
    /// component copying the horizontal one.
    pub fn resolve_default_resolution(&mut self, job: &JobTicket) {
        if self.resolution != UNSET_RESOLUTION {
            return;
        }
        let (mut x, mut y) = job
            .attr("DefaultResolution")
            .and_then(parse_resolution)
            .unwrap_or((FALLBACK_DPI, FALLBACK_DPI));
        if x == 0 {
            x = FALLBACK_DPI;
        }
        if y == 0 {
            y = x;
        }
        self.resolution = (x, y);
        self.recompute_dimensions();
    }

    fn recompute_dimensions(&mut self) {
        self.width = pixel_extent(self.resolution.0, self.page_size.0);
        self.height = pixel_extent(self.resolution.1, self.page_size.1);
    }
}

/// Pixel extent of one axis: `dpi × points / 72`, widened so an absurd
/// queue resolution cannot overflow, clamped back into the header's range.
fn pixel_extent(dpi: u32, points: u32) -> u32 {
    let pixels = u64::from(dpi) * u64::from(points) / 72;
    u32::try_from(pixels).unwrap_or(u32::MAX)
}

/// Parse a resolution value like `600dpi` or `1200x600dpi`.
///
/// A single number applies to both axes. Returns `None` when the value does
/// not start with a number; zero components are kept and fixed up by the
/// caller.
fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"^\s*(\d+)\s*(?:x\s*(\d+))?").unwrap();
    let caps = re.captures(value)?;
    let x: u32 = caps.get(1)?.as_str().parse().ok()?;
    let y: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => x,
    };
    Some((x, y))
}

fn lookup_page_size(name: &str) -> Option<(u32, u32)> {
    PAGE_SIZES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|&(_, size)| size)
}

fn parse_color_model(value: &str) -> Option<ColorSpace> {
    if value.eq_ignore_ascii_case("rgb") {
        Some(ColorSpace::Rgb)
    } else if value.eq_ignore_ascii_case("cmy") {
        Some(ColorSpace::Cmy)
    } else if value.eq_ignore_ascii_case("srgb") {
        Some(ColorSpace::Srgb)
    } else if value.eq_ignore_ascii_case("adobergb") {
        Some(ColorSpace::AdobeRgb)
    } else if value.eq_ignore_ascii_case("cmyk") {
        Some(ColorSpace::Cmyk)
    } else if value.eq_ignore_ascii_case("gray")
        || value.eq_ignore_ascii_case("grey")
        || value.eq_ignore_ascii_case("sw")
    {
        Some(ColorSpace::Gray)
    } else if value.eq_ignore_ascii_case("k") || value.eq_ignore_ascii_case("mono") {
        Some(ColorSpace::Black)
    } else if value.eq_ignore_ascii_case("w") {
        Some(ColorSpace::White)
    } else {
        None
    }
}

fn parse_color_mode(value: &str) -> Option<ColorSpace> {
    if value.eq_ignore_ascii_case("color") {
        Some(ColorSpace::Srgb)
    } else if value.eq_ignore_ascii_case("monochrome")
        || value.eq_ignore_ascii_case("auto-monochrome")
        || value.eq_ignore_ascii_case("process-monochrome")
    {
        Some(ColorSpace::Gray)
    } else if value.eq_ignore_ascii_case("bi-level") {
        Some(ColorSpace::Black)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::parse_options;

    #[test]
    fn resolution_values_parse() {
        assert_eq!(parse_resolution("600dpi"), Some((600, 600)));
        assert_eq!(parse_resolution("1200x600dpi"), Some((1200, 600)));
        assert_eq!(parse_resolution(" 300 x 300 "), Some((300, 300)));
        assert_eq!(parse_resolution("0x600"), Some((0, 600)));
        assert_eq!(parse_resolution("draft"), None);
        assert_eq!(parse_resolution(""), None);
    }

    #[test]
    fn letter_at_300dpi_is_the_default_geometry() {
        let job = JobTicket::default();
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.resolution, (100, 100));
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (300, 300));
        assert_eq!(header.page_size, (612, 792));
        assert_eq!((header.width, header.height), (2550, 3300));
        assert_eq!(header.color_space, ColorSpace::Srgb);
        assert_eq!(header.num_copies, 1);
        assert!(!header.collate);
        assert_eq!(header.rendering_intent, "auto");
    }

    #[test]
    fn queue_default_resolution_fills_the_sentinel() {
        let mut job = JobTicket::default();
        job.printer_attrs
            .insert("DefaultResolution".to_string(), "600dpi".to_string());
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (600, 600));
        assert_eq!((header.width, header.height), (5100, 6600));
    }

    #[test]
    fn job_resolution_wins_over_queue_default() {
        let mut job = JobTicket::default();
        job.options = parse_options("Resolution=150x200dpi");
        job.printer_attrs
            .insert("DefaultResolution".to_string(), "600dpi".to_string());
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (150, 200));
        assert_eq!((header.width, header.height), (1275, 2200));
    }

    #[test]
    fn zero_components_fall_back_per_axis() {
        let mut job = JobTicket::default();
        job.printer_attrs
            .insert("DefaultResolution".to_string(), "0x600".to_string());
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (300, 600));

        job.printer_attrs
            .insert("DefaultResolution".to_string(), "draft".to_string());
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (300, 300));
    }

    #[test]
    fn huge_resolution_attributes_do_not_overflow_geometry() {
        let mut job = JobTicket::default();
        job.printer_attrs
            .insert("DefaultResolution".to_string(), "8000000x8000000".to_string());
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (8_000_000, 8_000_000));
        assert_eq!((header.width, header.height), (68_000_000, 88_000_000));

        // Beyond even the widened range the extent clamps instead of
        // wrapping.
        let mut job = JobTicket::default();
        job.options = parse_options("Resolution=4000000000x4000000000");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!((header.width, header.height), (u32::MAX, u32::MAX));
    }

    #[test]
    fn zeroed_resolution_option_counts_as_unset() {
        let mut job = JobTicket::default();
        job.options = parse_options("Resolution=0x600");
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.resolution, (100, 100));
        header.resolve_default_resolution(&job);
        assert_eq!(header.resolution, (300, 300));
    }

    #[test]
    fn page_size_names_resolve_case_insensitively() {
        let mut job = JobTicket::default();
        job.options = parse_options("PageSize=A4");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.page_size, (595, 842));

        job.options = parse_options("media=legal");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.page_size, (612, 1008));

        job.options = parse_options("PageSize=Credentials");
        job.printer_attrs
            .insert("DefaultPageSize".to_string(), "Tabloid".to_string());
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.page_size, (792, 1224));
    }

    #[test]
    fn color_space_selection_order() {
        let mut job = JobTicket::default();
        job.options = parse_options("ColorModel=CMYK print-color-mode=monochrome");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.color_space, ColorSpace::Cmyk);

        job.options = parse_options("print-color-mode=monochrome");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.color_space, ColorSpace::Gray);

        job.options = parse_options("print-color-mode=bi-level");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.color_space, ColorSpace::Black);

        job.options.clear();
        job.printer_attrs
            .insert("DefaultColorModel".to_string(), "Gray".to_string());
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert_eq!(header.color_space, ColorSpace::Gray);
    }

    #[test]
    fn collate_option_must_be_literally_true() {
        let mut job = JobTicket::default();
        job.options = parse_options("Collate");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert!(header.collate);

        job.options = parse_options("Collate=yes");
        let header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        assert!(!header.collate);
    }
}
