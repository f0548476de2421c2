/*!
# Motivation
When CUPS prints to a driverless or raster-only printer, the job travels
through a filter chain that ends with the document being rasterized. This
crate implements the PDF-to-PWG-raster step of that chain on top of MuPDF:
it takes a PDF on its input, has `mutool draw` render it, and passes the
raster stream through to its output. The filter itself never touches page
content; its job is to work out the right rendering parameters and to
supervise the engine reliably, including relaying the engine's diagnostics
into the CUPS logging convention and reacting to job cancellation.

The interesting parts are not the rendering but the bookkeeping around it:
picking resolution, page size and color space from job options and PPD
defaults, honoring the copy-count and collation directives that the
`pdftopdf` stage embeds in the document head, and normalizing how the engine
died (exit code, signal, cancellation) into a single status.

# Setup
The `mutool` utility must be available on your system. By default it is
looked up as `mutool` on `PATH`; point the `MUPDF_BIN` environment variable
at a specific binary to override that.

# Invocation
The binary follows the standard CUPS filter convention:

```text
rastro job-id user title copies options [filename]
```

The document arrives on standard input unless a filename is given, raster
bytes leave on standard output, and log lines go to standard error with the
usual `DEBUG:`/`INFO:`/`WARNING:`/`ERROR:` prefixes. The queue's PPD file is
taken from the `PPD` environment variable when set.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod args;
mod doc;
mod filter;
mod job;
mod page;
mod spawn;

pub use args::*;
pub use doc::*;
pub use filter::*;
pub use job::*;
pub use page::*;
pub use spawn::*;
