use std::ffi::OsString;
use std::path::Path;

use crate::page::{ColorSpace, PageHeader};

/// Build the engine command line for one conversion.
///
/// The vector is fully determined by the descriptor: program, `draw`
/// subcommand, fixed mode flags, resolution, pixel dimensions, color mode,
/// then the staged input path. Order is fixed and no entry is ever omitted.
pub fn build_args(program: &Path, header: &PageHeader, input: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(11);
    args.push(program.as_os_str().to_os_string());
    args.push(OsString::from("draw"));
    args.push(OsString::from("-L"));
    args.push(OsString::from("-o-"));
    args.push(OsString::from("-smtf"));
    args.push(OsString::from(format!("-F{}", header.flavor.format_name())));
    args.push(OsString::from(resolution_flag(header.resolution)));
    args.push(OsString::from(format!("-w{}", header.width)));
    args.push(OsString::from(format!("-h{}", header.height)));
    args.push(OsString::from(color_flag(header.color_space)));
    args.push(input.as_os_str().to_os_string());
    args
}

fn resolution_flag((x, y): (u32, u32)) -> String {
    // Descriptor synthesis never leaves both axes at zero, but the flag must
    // still be present if it somehow does.
    if x == 0 && y == 0 {
        "-r100x100".to_string()
    } else {
        format!("-r{x}x{y}")
    }
}

fn color_flag(space: ColorSpace) -> &'static str {
    match space {
        ColorSpace::Rgb | ColorSpace::Cmy | ColorSpace::Srgb | ColorSpace::AdobeRgb => "-crgb",
        ColorSpace::Cmyk => "-ccmyk",
        ColorSpace::Gray => "-cgray",
        ColorSpace::Black | ColorSpace::White => "-cmono",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobTicket;
    use crate::page::RasterFlavor;

    fn letter_300() -> PageHeader {
        let job = JobTicket::default();
        let mut header = PageHeader::prepare(&job, RasterFlavor::Pwg);
        header.resolve_default_resolution(&job);
        header
    }

    #[test]
    fn command_line_is_exact_and_ordered() {
        let args = build_args(
            Path::new("mutool"),
            &letter_300(),
            Path::new("/tmp/stage/input.pdf"),
        );
        let expected: Vec<OsString> = [
            "mutool",
            "draw",
            "-L",
            "-o-",
            "-smtf",
            "-Fpwg",
            "-r300x300",
            "-w2550",
            "-h3300",
            "-crgb",
            "/tmp/stage/input.pdf",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn identical_descriptors_build_identical_vectors() {
        let header = letter_300();
        let a = build_args(Path::new("mutool"), &header, Path::new("in.pdf"));
        let b = build_args(Path::new("mutool"), &header, Path::new("in.pdf"));
        assert_eq!(a, b);
    }

    #[test]
    fn color_flags_follow_the_mapping_table() {
        let cases = [
            (ColorSpace::Rgb, "-crgb"),
            (ColorSpace::Cmy, "-crgb"),
            (ColorSpace::Srgb, "-crgb"),
            (ColorSpace::AdobeRgb, "-crgb"),
            (ColorSpace::Cmyk, "-ccmyk"),
            (ColorSpace::Gray, "-cgray"),
            (ColorSpace::Black, "-cmono"),
            (ColorSpace::White, "-cmono"),
        ];
        for (space, flag) in cases {
            let mut header = letter_300();
            header.color_space = space;
            let args = build_args(Path::new("mutool"), &header, Path::new("in.pdf"));
            assert_eq!(args[9], OsString::from(flag), "for {space:?}");
        }
    }

    #[test]
    fn unset_resolution_still_emits_a_flag() {
        let mut header = letter_300();
        header.resolution = (0, 0);
        let args = build_args(Path::new("mutool"), &header, Path::new("in.pdf"));
        assert_eq!(args[6], OsString::from("-r100x100"));
    }

    #[test]
    fn pclm_flavor_switches_the_format_flag() {
        let job = JobTicket::default();
        let header = PageHeader::prepare(&job, RasterFlavor::Pclm);
        let args = build_args(Path::new("mutool"), &header, Path::new("in.pdf"));
        assert_eq!(args[5], OsString::from("-Fpclm"));
    }
}
