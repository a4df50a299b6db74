use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI with a custom HOME directory for isolated profile storage.
pub fn run_cli_with_env(args: &[&str], home: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_parse"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    for var in [
        "PARSE_APPLICATION_ID",
        "PARSE_REST_API_KEY",
        "PARSE_MASTER_KEY",
        "PARSE_SERVER_URL",
        "PARSE_SESSION_TOKEN",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI with a custom HOME and expect success.
pub fn run_cli_with_env_success(args: &[&str], home: &Path) -> String {
    let output = run_cli_with_env(args, home);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}
