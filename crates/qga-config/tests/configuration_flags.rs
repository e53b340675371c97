use std::time::Duration;

use rstest::rstest;

use qga_config::{
    Config, ConfigError, DEFAULT_PID_FILE, DEFAULT_VIRTIO_SERIAL_PATH, LogFormat, LogSink,
    TransportMethod,
};

fn load(args: &[&str]) -> Result<Config, ConfigError> {
    Config::load_from_iter(std::iter::once("qemu-ga").chain(args.iter().copied()))
}

#[test]
fn defaults_target_the_virtio_port() {
    let config = load(&[]).expect("defaults should load");
    let endpoint = config.endpoint();
    assert_eq!(endpoint.method(), TransportMethod::VirtioSerial);
    assert_eq!(endpoint.path().as_str(), DEFAULT_VIRTIO_SERIAL_PATH);
    assert_eq!(config.pid_file().as_str(), DEFAULT_PID_FILE);
    assert_eq!(config.log_sink(), &LogSink::Stderr);
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.dial_timeout(), Duration::from_secs(30));
    assert!(config.blacklist().is_empty());
}

#[rstest]
#[case::isa(&["-m", "isa-serial"], TransportMethod::IsaSerial, "/dev/ttyS0")]
#[case::unix(&["--method", "unix-listen"], TransportMethod::UnixListen, "/var/run/qemu-ga.sock")]
#[case::explicit_path(
    &["-m", "unix-listen", "-p", "/run/qga/agent.sock"],
    TransportMethod::UnixListen,
    "/run/qga/agent.sock"
)]
fn method_selects_default_path(
    #[case] args: &[&str],
    #[case] method: TransportMethod,
    #[case] path: &str,
) {
    let config = load(args).expect("config should load");
    let endpoint = config.endpoint();
    assert_eq!(endpoint.method(), method);
    assert_eq!(endpoint.path().as_str(), path);
}

#[test]
fn blacklist_accepts_lists_and_repeats() {
    let config = load(&["-b", "guest-shutdown,guest-exec", "--blacklist", "guest-file-open"])
        .expect("config should load");
    let blacklist = config.blacklist();
    assert!(blacklist.contains("guest-shutdown"));
    assert!(blacklist.contains("guest-exec"));
    assert!(blacklist.contains("guest-file-open"));
    assert!(!blacklist.is_listing_requested());
}

#[test]
fn question_mark_requests_command_listing() {
    let config = load(&["-b", "?"]).expect("config should load");
    assert!(config.blacklist().is_listing_requested());
}

#[rstest]
#[case::verbose(&["-v"], "debug")]
#[case::explicit(&["--log-filter", "warn"], "warn")]
#[case::explicit_wins(&["-v", "--log-filter", "trace"], "trace")]
fn log_filter_precedence(#[case] args: &[&str], #[case] expected: &str) {
    let config = load(args).expect("config should load");
    assert_eq!(config.log_filter(), expected);
}

#[test]
fn logfile_and_format_flags() {
    let config = load(&["-l", "/var/log/qga.log", "--log-format", "compact"])
        .expect("config should load");
    assert_eq!(
        config.log_sink().file_path().map(|path| path.as_str()),
        Some("/var/log/qga.log")
    );
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[test]
fn rejects_relative_state_directory() {
    let error = load(&["-t", "run/qga"]).expect_err("relative statedir must fail");
    assert!(matches!(error, ConfigError::RelativeStateDir { .. }));
}

#[test]
fn rejects_zero_dial_timeout() {
    let error = load(&["--dial-timeout-ms", "0"]).expect_err("zero timeout must fail");
    assert!(matches!(error, ConfigError::ZeroDialTimeout));
}

#[test]
fn rejects_unknown_method() {
    let error = load(&["-m", "vsock-listen"]).expect_err("unknown method must fail");
    assert!(matches!(error, ConfigError::Cli(_)));
}

#[test]
fn help_is_reported_through_cli_error() {
    let error = load(&["--help"]).expect_err("help short-circuits parsing");
    let ConfigError::Cli(inner) = error else {
        panic!("expected clap error");
    };
    assert_eq!(inner.kind(), clap::error::ErrorKind::DisplayHelp);
}
