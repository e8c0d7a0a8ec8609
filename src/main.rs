use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = vidapay::run() {
        eprintln!("vidapay: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
