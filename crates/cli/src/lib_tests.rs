use clap::Parser;
use serial_test::serial;

use super::*;

#[test]
fn parses_the_default_config_path_when_no_flags_are_given() {
    let args = Args::parse_from(["turbulence"]);
    assert_eq!(args.config, PathBuf::from("turbulence.conf.xml"));
    assert!(!args.conf_location);
}

#[test]
fn parses_an_explicit_config_path() {
    let args = Args::parse_from(["turbulence", "--config", "/tmp/x.conf.xml"]);
    assert_eq!(args.config, PathBuf::from("/tmp/x.conf.xml"));
}

#[tokio::test]
#[serial]
async fn conf_location_reports_the_sysconfdir_and_never_touches_a_context() {
    std::env::set_var("TURBULENCE_SYSCONFDIR", "/tmp/fake-sysconfdir-cli");
    let args = Args {
        config: PathBuf::from("ignored.conf.xml"),
        runtime_dir: None,
        conf_location: true,
    };
    let code = run(args).await;
    assert_eq!(code, ExitCode::Normal);
    std::env::remove_var("TURBULENCE_SYSCONFDIR");
}

#[tokio::test]
async fn a_missing_config_file_maps_to_the_config_error_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let args = Args {
        config: dir.path().join("does-not-exist.conf.xml"),
        runtime_dir: Some(dir.path().join("runtime")),
        conf_location: false,
    };
    let code = run(args).await;
    assert_eq!(code, ExitCode::ConfigError);
}

#[test]
fn exit_code_discriminants_match_the_documented_mapping() {
    assert_eq!(ExitCode::Normal as u8, 0);
    assert_eq!(ExitCode::ConfigError as u8, 1);
    assert_eq!(ExitCode::BeepEngineInitFailure as u8, 2);
    assert_eq!(ExitCode::ModuleInitFailure as u8, 3);
}
