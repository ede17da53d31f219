use std::process::ExitCode;

fn main() -> ExitCode {
    tabula_cli::run()
}
