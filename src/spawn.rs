use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, PipeReader};
use std::os::fd::OwnedFd;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use log::Level;

/// Status reported when no engine status was obtained: pipe or launch
/// failure, or a canceled job. Sits above both the exit-code range (0-255)
/// and the signal range (256 times the signal number).
pub const STATUS_ABORTED: i32 = 65536;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Severity prefixes of the CUPS filter protocol, in match priority order.
/// Matching is case-sensitive and the order is part of the contract.
const SEVERITY_PREFIXES: &[(&str, Level)] = &[
    ("DEBUG: ", Level::Debug),
    ("DEBUG2: ", Level::Debug),
    ("INFO: ", Level::Info),
    ("WARNING: ", Level::Warn),
    ("ERROR: ", Level::Error),
];

/// Run the engine to completion, relaying its diagnostics.
///
/// The engine's stdout is bound to `output` and its stderr to a private
/// pipe drained by a relay thread. The wait loop polls both and checks
/// `is_canceled` once per round; on cancellation the engine is killed and
/// the call returns without waiting for either to die. The result is the
/// engine's exit code, `256 * signal` for a signal death, or
/// [`STATUS_ABORTED`] when no engine status was obtained.
pub fn supervise<F: Fn() -> bool>(argv: &[OsString], output: OwnedFd, is_canceled: F) -> i32 {
    log::debug!("{}", format_command_line(argv));

    let Some((program, engine_args)) = argv.split_first() else {
        log::error!("rastro: Empty engine command line");
        return STATUS_ABORTED;
    };

    let (err_read, err_write) = match io::pipe() {
        Ok(ends) => ends,
        Err(err) => {
            log::error!("rastro: Unable to establish stderr pipe for mutool call: {err}");
            return STATUS_ABORTED;
        }
    };

    // Spawn without binding the Command: it keeps copies of the pipe write
    // end and the output descriptor until dropped, and the relay only sees
    // end-of-stream once this process holds no write end.
    let mut engine = match Command::new(program)
        .args(engine_args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(output))
        .stderr(Stdio::from(err_write))
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            log::error!(
                "rastro: Unable to launch mutool: {}: {err}",
                program.to_string_lossy()
            );
            return STATUS_ABORTED;
        }
    };
    let engine_pid = engine.id();
    log::debug!("rastro: Started mutool (PID {engine_pid})");

    let mut relay = match thread::Builder::new()
        .name("stderr-relay".to_string())
        .spawn(move || relay_diagnostics(err_read))
    {
        Ok(handle) => {
            log::debug!("rastro: Started logging relay");
            Some(handle)
        }
        Err(err) => {
            log::error!("rastro: Unable to start logging relay: {err}");
            None
        }
    };

    let mut engine_pending = true;
    let mut relay_pending = relay.is_some();
    let mut status = STATUS_ABORTED;

    while engine_pending || relay_pending {
        if is_canceled() {
            log::debug!("rastro: Job canceled, killing mutool ...");
            // An engine that already finished keeps its recorded status; its
            // classification is authoritative even on a late cancel.
            if engine_pending {
                let _ = engine.kill();
                status = STATUS_ABORTED;
            }
            break;
        }

        if engine_pending {
            match engine.try_wait() {
                Ok(Some(exit)) => {
                    engine_pending = false;
                    status = classify_exit(engine_pid, exit);
                }
                Ok(None) => {}
                // Spurious wait errors are transient, keep polling.
                Err(_) => {}
            }
        }

        if relay_pending && relay.as_ref().is_some_and(|handle| handle.is_finished()) {
            relay_pending = false;
            if let Some(handle) = relay.take() {
                match handle.join() {
                    Ok(()) => log::debug!("rastro: Logging finished."),
                    Err(_) => log::error!("rastro: Logging relay panicked"),
                }
            }
        }

        if engine_pending || relay_pending {
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    status
}

fn classify_exit(pid: u32, exit: ExitStatus) -> i32 {
    if let Some(signal) = exit.signal() {
        log::error!("rastro: mutool (PID {pid}) crashed on signal {signal}");
        return 256 * signal;
    }
    match exit.code() {
        Some(code) if code != 0 => {
            log::error!("rastro: mutool (PID {pid}) stopped with status {code}");
            code
        }
        _ => {
            log::debug!("rastro: mutool (PID {pid}) exited with no errors.");
            0
        }
    }
}

fn format_command_line(argv: &[OsString]) -> String {
    let mut line = String::from("rastro: mutool command line:");
    for arg in argv {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.contains(' ') || arg.contains('\t') {
            line.push('\'');
            line.push_str(&arg);
            line.push('\'');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

/// Drain the engine's stderr until end-of-stream, forwarding each line to
/// the log sink at the severity its prefix names. Read errors end the relay
/// silently; the engine's fate is tracked by the wait loop, not here.
fn relay_diagnostics(stderr: PipeReader) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\n', '\r']);
        let (level, message) = classify_line(text);
        log::log!(level, "rastro: {message}");
    }
}

fn classify_line(line: &str) -> (Level, &str) {
    for (prefix, level) in SEVERITY_PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            return (*level, rest);
        }
    }
    (Level::Debug, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_classify_by_prefix_priority() {
        assert_eq!(classify_line("DEBUG: d"), (Level::Debug, "d"));
        assert_eq!(classify_line("DEBUG2: dd"), (Level::Debug, "dd"));
        assert_eq!(classify_line("INFO: i"), (Level::Info, "i"));
        assert_eq!(classify_line("WARNING: w"), (Level::Warn, "w"));
        assert_eq!(classify_line("ERROR: e"), (Level::Error, "e"));
    }

    #[test]
    fn unmatched_lines_pass_through_at_debug() {
        assert_eq!(classify_line("page 1/2"), (Level::Debug, "page 1/2"));
        // Prefix match is literal, including the space.
        assert_eq!(classify_line("ERROR:tight"), (Level::Debug, "ERROR:tight"));
        assert_eq!(classify_line("error: lower"), (Level::Debug, "error: lower"));
        assert_eq!(classify_line(""), (Level::Debug, ""));
    }

    #[test]
    fn exit_classification_separates_codes_from_signals() {
        assert_eq!(classify_exit(1, ExitStatus::from_raw(0)), 0);
        assert_eq!(classify_exit(1, ExitStatus::from_raw(0x0200)), 2);
        assert_eq!(classify_exit(1, ExitStatus::from_raw(0x7f00)), 127);
        assert_eq!(classify_exit(1, ExitStatus::from_raw(9)), 2304);
        assert_eq!(classify_exit(1, ExitStatus::from_raw(15)), 3840);
    }

    #[test]
    fn command_lines_quote_arguments_with_whitespace() {
        let argv: Vec<OsString> = ["mutool", "draw", "-o-", "/tmp/a b/input.pdf"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(
            format_command_line(&argv),
            "rastro: mutool command line: mutool draw -o- '/tmp/a b/input.pdf'"
        );
    }
}
