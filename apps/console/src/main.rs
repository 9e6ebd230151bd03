//! # formwork-console Entry Point
//!
//! Setup lives in `lib.rs` so it can be tested; this only maps a failed
//! session to a process exit status.

fn main() {
    if let Err(e) = formwork_console_lib::run() {
        eprintln!("error [{:?}]: {}", e.code(), e);
        std::process::exit(e.exit_code());
    }
}
