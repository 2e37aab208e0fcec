use std::process::ExitCode;

fn main() -> ExitCode {
    coindash_cli::run()
}
