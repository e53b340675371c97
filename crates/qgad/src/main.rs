use std::process::ExitCode;

fn main() -> ExitCode {
    match qgad::run_agent() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            if let Some(cli) = error.cli_error() {
                let status = if cli.use_stderr() { 1 } else { 0 };
                if cli.print().is_err() {
                    return ExitCode::FAILURE;
                }
                return ExitCode::from(status);
            }
            eprintln!("qemu-ga: {error}");
            ExitCode::from(error.exit_status())
        }
    }
}
