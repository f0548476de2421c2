use std::fs::OpenOptions;
use std::io::{self, BufReader, Read};
use std::os::fd::OwnedFd;

use tempdir::TempDir;
use thiserror::Error;

use crate::args::build_args;
use crate::doc::{self, DocType};
use crate::job::{ColorCalibration, JobTicket};
use crate::page::{PageHeader, RasterFlavor};
use crate::spawn;

#[derive(Debug, Error)]
enum ConvertError {
    #[error("Can't create temporary file: {0}")]
    StageCreate(io::Error),
    #[error("Can't copy input to temporary file: {0}")]
    StageCopy(io::Error),
    #[error("Can't read temporary file: {0}")]
    StageRead(io::Error),
    #[error("input file cannot be identified")]
    UnrecognizedFormat,
}

/// Convert a PDF stream to PWG raster output.
///
/// The input is staged into a temporary file so it can be sniffed and
/// re-scanned, a page descriptor is synthesized from the job ticket, and
/// the rendering engine is run with its stdout bound to `output`. Returns
/// 0 on success and 1 on any failure; diagnostic detail only ever goes to
/// the log sink. Empty input is not a failure: the engine is skipped and
/// the output is closed with nothing written, which is a valid zero-page
/// file.
pub fn convert<R, F>(input: &mut R, output: OwnedFd, job: &JobTicket, is_canceled: F) -> i32
where
    R: Read + ?Sized,
    F: Fn() -> bool,
{
    match run(input, output, job, is_canceled) {
        Ok(status) => status,
        Err(err) => {
            log::error!("rastro: {err}");
            1
        }
    }
}

fn run<R, F>(
    input: &mut R,
    output: OwnedFd,
    job: &JobTicket,
    is_canceled: F,
) -> Result<i32, ConvertError>
where
    R: Read + ?Sized,
    F: Fn() -> bool,
{
    let staging = TempDir::new("rastro").map_err(ConvertError::StageCreate)?;
    let staged_path = staging.path().join("input.pdf");
    let staged = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&staged_path)
        .map_err(ConvertError::StageCreate)?;
    let mut staged = BufReader::new(staged);
    io::copy(input, staged.get_mut()).map_err(ConvertError::StageCopy)?;

    match doc::sniff(&mut staged).map_err(ConvertError::StageRead)? {
        DocType::Unrecognized => return Err(ConvertError::UnrecognizedFormat),
        DocType::Empty => {
            // Not an error. Close the output with nothing written so the
            // caller still gets a well-formed, zero-page file.
            drop(output);
            log::info!("rastro: Input is empty, outputting empty file.");
            return Ok(0);
        }
        DocType::Pdf => {}
    }

    let cm_disabled = job.color_calibration() == ColorCalibration::Enabled
        || job.color_management_disabled();
    // The profile handle is only held for the duration of the call; the
    // engine does its own color conversion.
    let _icc_profile = if cm_disabled { None } else { job.icc_profile() };
    if cm_disabled {
        log::debug!("rastro: Color management disabled for this job.");
    }

    let mut header = PageHeader::prepare(job, RasterFlavor::Pwg);
    header.resolve_default_resolution(job);
    doc::scan_inline_directives(&mut staged, &mut header).map_err(ConvertError::StageRead)?;
    // pdftopdf upstream has already applied any mirroring and rotation.
    header.mirror = false;
    header.orientation = 0;
    log::debug!("rastro: Print rendering intent = {}", header.rendering_intent);

    let program = job.renderer_program();
    log::debug!("rastro: command: {}", program.display());
    let argv = build_args(&program, &header, &staged_path);

    let status = spawn::supervise(&argv, output, is_canceled);
    Ok(if status != 0 { 1 } else { 0 })
}
