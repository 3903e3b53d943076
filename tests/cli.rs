use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_venver");
const SHIM: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/venver.sh");
const USAGE: &str = "Usage: venv <command> [<args>]";

fn venver(root: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env("VIRTUAL_ENV_HOME", root)
        .env("VIRTUAL_ENV_CREATE", "true")
        .env_remove("VENVER_SHELL")
        .env_remove("VIRTUAL_ENV_NAME")
        .env_remove("VIRTUAL_ENV_PREV_DIR")
        .output()
        .expect("failed to run venver")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Run `script` in bash after sourcing the shim, the way a user's shell would.
fn bash(root: &Path, script: &str) -> Option<Output> {
    if !Path::new("/bin/bash").exists() {
        return None;
    }
    let commands = format!(
        "export VIRTUAL_ENV_HOME='{root}'; source '{SHIM}'; {script}",
        root = root.display()
    );
    let output = Command::new("/bin/bash")
        .arg("-c")
        .arg(commands)
        .env("VENVER_BIN", BIN)
        .env("VIRTUAL_ENV_CREATE", "true")
        .env_remove("VIRTUAL_ENV_NAME")
        .env_remove("VIRTUAL_ENV_PREV_DIR")
        .current_dir(root)
        .output()
        .expect("failed to run bash");
    Some(output)
}

#[test]
fn no_arguments_prints_usage() {
    let tmp = TempDir::new().unwrap();
    let output = venver(tmp.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains(USAGE));
    assert!(output.stderr.is_empty());
}

#[test]
fn unsupported_command() {
    let tmp = TempDir::new().unwrap();
    let output = venver(tmp.path(), &["booboo"]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    let usage = text.find(USAGE).expect("usage line");
    let unsupported = text
        .find("venv: unsupported command booboo")
        .expect("unsupported line");
    assert!(usage < unsupported);
}

#[test]
fn create_list_remove() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    assert_eq!(venver(root, &["create", "web"]).status.code(), Some(0));
    assert_eq!(venver(root, &["create", "api"]).status.code(), Some(0));

    let listed = venver(root, &["list"]);
    assert_eq!(listed.status.code(), Some(0));
    assert_eq!(stdout(&listed), "api\nweb\n");

    let again = venver(root, &["create", "web"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stdout(&again).contains("already exists"));
    assert!(root.join("web").is_dir());

    assert_eq!(venver(root, &["remove", "web"]).status.code(), Some(0));
    assert_eq!(stdout(&venver(root, &["list"])), "api\n");

    let missing = venver(root, &["remove", "web"]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(!root.join("web").exists());
}

#[test]
fn failing_collaborator_is_reported() {
    let tmp = TempDir::new().unwrap();
    let output = Command::new(BIN)
        .args(["create", "web"])
        .env("VIRTUAL_ENV_HOME", tmp.path())
        .env("VIRTUAL_ENV_CREATE", "false")
        .env_remove("VENVER_SHELL")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("venv: failed to create environment web: exit status 1"));
    assert!(!tmp.path().join("web").exists());
}

#[test]
fn missing_home_variable() {
    let output = Command::new(BIN)
        .arg("list")
        .env_remove("VIRTUAL_ENV_HOME")
        .env_remove("VENVER_SHELL")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "venv: VIRTUAL_ENV_HOME is not set\n");
}

#[test]
#[cfg(unix)]
fn non_utf8_variable_is_ignored() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("web")).unwrap();
    let output = Command::new(BIN)
        .arg("list")
        .env("VIRTUAL_ENV_HOME", tmp.path())
        .env("SOME_UNRELATED", OsStr::from_bytes(b"caf\xe9"))
        .env_remove("VENVER_SHELL")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "web\n");
}

#[test]
fn blank_create_command_only_affects_create() {
    let tmp = TempDir::new().unwrap();
    let run = |args: &[&str]| {
        Command::new(BIN)
            .args(args)
            .env("VIRTUAL_ENV_HOME", tmp.path())
            .env("VIRTUAL_ENV_CREATE", "   ")
            .env_remove("VENVER_SHELL")
            .env_remove("VIRTUAL_ENV_NAME")
            .env_remove("VIRTUAL_ENV_PREV_DIR")
            .output()
            .unwrap()
    };

    let output = run(&["deactivate"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "");

    let output = run(&["create", "web"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "venv: failed to create environment web: no creation command configured\n"
    );
    assert!(!tmp.path().join("web").exists());
}

#[test]
fn shim_shows_help() {
    let tmp = TempDir::new().unwrap();
    let Some(output) = bash(tmp.path(), "venv") else {
        return;
    };
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains(USAGE));
}

#[test]
fn shim_rejects_unknown_command() {
    let tmp = TempDir::new().unwrap();
    let Some(output) = bash(tmp.path(), "venv booboo") else {
        return;
    };
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains(USAGE));
    assert!(text.contains("venv: unsupported command booboo"));
}

#[test]
fn shim_activates_and_deactivates() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let script = r#"
        start="$PWD"
        venv create web >/dev/null || exit 10
        venv activate web || exit 11
        echo "active=$VIRTUAL_ENV_NAME"
        echo "dir=$PWD"
        venv deactivate || exit 12
        echo "after=${VIRTUAL_ENV_NAME-unset}"
        [ "$PWD" = "$start" ] && echo back
        venv deactivate || exit 13
        venv activate ghost
        echo "status=$?"
    "#;
    let Some(output) = bash(root, script) else {
        return;
    };
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0), "{text}");
    assert!(text.contains("active=web\n"), "{text}");
    assert!(text.contains(&format!("dir={}\n", root.join("web").display())), "{text}");
    assert!(text.contains("after=unset\n"), "{text}");
    assert!(text.contains("back\n"), "{text}");
    assert!(text.contains("venv: environment ghost does not exist\nstatus=1\n"), "{text}");
}
