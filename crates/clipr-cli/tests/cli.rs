//! Drives the `clipr` binary end to end

use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

fn clipr(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_clipr"));
    cmd.env("HOME", home)
        .env("CLIPR_CONFIG", home.join("config.toml"))
        .env_remove("CLIPR_KEY_DIR")
        .env_remove("CLIPR_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().unwrap()
}

fn key_dir(home: &Path) -> std::path::PathBuf {
    home.join(".clipr")
}

#[test]
fn genkey_prints_public_key_and_refuses_to_overwrite() {
    let home = tempfile::TempDir::new().unwrap();

    let out = run(clipr(home.path()).arg("genkey"));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let printed = String::from_utf8(out.stdout).unwrap();
    let printed = printed.trim();
    assert_eq!(printed.len(), 64);

    let public = std::fs::read(key_dir(home.path()).join("key.pub")).unwrap();
    assert_eq!(hex::encode(public), printed);

    let again = run(clipr(home.path()).arg("genkey"));
    assert_eq!(again.status.code(), Some(8));
}

#[test]
fn missing_keys_exit_7() {
    let home = tempfile::TempDir::new().unwrap();
    let out = run(clipr(home.path()).arg("paste"));
    assert_eq!(out.status.code(), Some(7));
}

#[test]
fn mismatched_public_key_exits_7() {
    let home = tempfile::TempDir::new().unwrap();
    assert!(run(clipr(home.path()).arg("genkey")).status.success());
    std::fs::write(key_dir(home.path()).join("key.pub"), [7u8; 32]).unwrap();

    let out = run(clipr(home.path()).arg("paste"));
    assert_eq!(out.status.code(), Some(7));
}

#[test]
fn missing_home_exits_7_instead_of_using_tmp() {
    let home = tempfile::TempDir::new().unwrap();
    let out = run(clipr(home.path()).env_remove("HOME").arg("genkey"));
    assert_eq!(out.status.code(), Some(7));
}

#[test]
fn server_without_trust_file_exits_7() {
    let home = tempfile::TempDir::new().unwrap();
    std::fs::create_dir(key_dir(home.path())).unwrap();
    let out = run(clipr(home.path()).args(["server", "--port", "0"]));
    assert_eq!(out.status.code(), Some(7));
}

#[test]
fn bad_arguments_exit_6() {
    let home = tempfile::TempDir::new().unwrap();
    assert_eq!(
        run(clipr(home.path()).args(["paste", "--port", "not-a-port"]))
            .status
            .code(),
        Some(6)
    );
    assert_eq!(run(clipr(home.path()).arg("frobnicate")).status.code(), Some(6));
    assert_eq!(
        run(clipr(home.path()).args(["open", "not a uri"])).status.code(),
        Some(6)
    );
}

#[test]
fn config_show_reflects_flags() {
    let home = tempfile::TempDir::new().unwrap();
    let out = run(clipr(home.path()).args(["config", "show", "--port", "4321"]));
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("defaults"));
    assert!(text.contains("port = 4321"));
}

struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[cfg(target_os = "linux")]
#[test]
fn copy_and_paste_through_server() {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let home = tempfile::TempDir::new().unwrap();
    let out = run(clipr(home.path()).arg("genkey"));
    assert!(out.status.success());

    let trusted = key_dir(home.path()).join("trusted");
    let mut file = std::fs::File::create(&trusted).unwrap();
    writeln!(file, "# the only client").unwrap();
    file.write_all(&out.stdout).unwrap();
    drop(file);
    std::fs::set_permissions(&trusted, std::fs::Permissions::from_mode(0o600)).unwrap();

    let port = free_port().to_string();
    let _server = ServerGuard(
        clipr(home.path())
            .args(["server", "--port", &port, "--ignore-session-lock"])
            .env_remove("DISPLAY")
            .env_remove("WAYLAND_DISPLAY")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );

    // wait for the listener
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let out = run(clipr(home.path()).args(["copy", "--port", &port, "over the wire"]));
        if out.status.success() {
            break;
        }
        assert!(Instant::now() < deadline, "server never came up");
        std::thread::sleep(Duration::from_millis(50));
    }

    let out = run(clipr(home.path()).args(["paste", "--port", &port]));
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, b"over the wire");

    let out = run(clipr(home.path()).args(["open", "--port", &port, "file:///etc/passwd"]));
    assert_eq!(out.status.code(), Some(8));
}
