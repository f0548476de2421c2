use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::path::Path;
use std::process;

use env_logger::Env;
use log::Level;

use rastro::{convert, load_ppd, parse_options, JobTicket};

fn main() {
    // CUPS reads the filter's stderr; each line must carry one of the
    // severity prefixes of the filter protocol.
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let tag = match record.level() {
                Level::Error => "ERROR",
                Level::Warn => "WARNING",
                Level::Info => "INFO",
                Level::Debug => "DEBUG",
                Level::Trace => "DEBUG2",
            };
            writeln!(buf, "{tag}: {}", record.args())
        })
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 6 || args.len() > 7 {
        eprintln!(
            "Usage: {} job-id user title copies options [file]",
            args.first().map(String::as_str).unwrap_or("rastro")
        );
        process::exit(1);
    }

    let mut ticket = JobTicket {
        printer: env::var("PRINTER").unwrap_or_default(),
        job_id: args[1].parse().unwrap_or(0),
        user: args[2].clone(),
        title: args[3].clone(),
        copies: args[4].parse().unwrap_or(1),
        options: parse_options(&args[5]),
        ..JobTicket::default()
    };
    if let Ok(ppd) = env::var("PPD") {
        match load_ppd(Path::new(&ppd)) {
            Ok(attrs) => ticket.printer_attrs = attrs,
            Err(err) => log::warn!("rastro: Unable to load PPD file {ppd}: {err}"),
        }
    }

    let output = match io::stdout().as_fd().try_clone_to_owned() {
        Ok(fd) => fd,
        Err(err) => {
            log::error!("rastro: Unable to duplicate stdout: {err}");
            process::exit(1);
        }
    };

    // Cancellation arrives as SIGTERM from the scheduler, which kills the
    // whole process group including the engine; there is nothing to poll
    // for when running standalone.
    let status = match args.get(6) {
        Some(path) => match File::open(path) {
            Ok(mut file) => convert(&mut file, output, &ticket, || false),
            Err(err) => {
                log::error!("rastro: Unable to open input file {path}: {err}");
                1
            }
        },
        None => convert(&mut io::stdin().lock(), output, &ticket, || false),
    };
    process::exit(status);
}
