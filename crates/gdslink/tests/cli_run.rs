#![cfg(all(unix, feature = "cli"))]

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use gdslink::frame::{FprimeFramer, FramerDeframer};
use gdslink::ground::{DEFAULT_REGISTRATION, DEFAULT_ROUTING_PREFIX};
use gdslink::updown::handshake_frame;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/gdslink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn accept_within(listener: &TcpListener, timeout: Duration) -> io::Result<TcpStream> {
    listener.set_nonblocking(true)?;
    let start = Instant::now();
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other("ground accept timeout"));
                }
                thread::sleep(Duration::from_millis(25));
            }
            Err(err) => return Err(err),
        }
    }
}

fn wait_for_connect(path: &Path, timeout: Duration) -> io::Result<UnixStream> {
    let start = Instant::now();
    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> ExitStatus {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().expect("child status should be readable") {
            return status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("gdslink did not exit within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn read_n(stream: &mut impl Read, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).expect("expected bytes should arrive");
    buf
}

fn routed(framer: &FprimeFramer, data: &[u8]) -> Vec<u8> {
    let mut out = DEFAULT_ROUTING_PREFIX.as_bytes().to_vec();
    out.extend_from_slice(&framer.frame(data).expect("data should frame"));
    out
}

#[test]
fn run_bridges_wire_and_ground_and_reports_stats() {
    let dir = unique_temp_dir("bridge");
    let wire_path = dir.join("fsw.sock");
    let tts = TcpListener::bind("127.0.0.1:0").expect("ground listener should bind");
    let ground_addr = tts.local_addr().expect("addr").to_string();

    let mut child = Command::new(env!("CARGO_BIN_EXE_gdslink"))
        .args(["--log-level", "error", "--format", "json", "run"])
        .args(["--adapter", "unix-server", "--address"])
        .arg(&wire_path)
        .args(["--ground-addr", &ground_addr])
        .args(["--read-timeout", "20ms", "--send-wait", "50ms"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("run command should start");

    let mut ground = accept_within(&tts, Duration::from_secs(5)).expect("gdslink should register");
    ground
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    assert_eq!(
        read_n(&mut ground, DEFAULT_REGISTRATION.len()),
        DEFAULT_REGISTRATION.as_bytes()
    );

    let mut flight = wait_for_connect(&wire_path, Duration::from_secs(5)).expect("wire should accept");
    flight
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    let framer = FprimeFramer::new();

    // Downlink: telemetry from flight reaches the ground behind the routing prefix.
    let telemetry = b"\x00\x00\x00\x01tlm";
    flight
        .write_all(&framer.frame(telemetry).expect("frame"))
        .expect("flight write");
    let expected = routed(&framer, telemetry);
    assert_eq!(read_n(&mut ground, expected.len()), expected);

    // Uplink: a ground command reaches flight and comes back as a handshake.
    let command = b"\x00\x00\x00\x00cmd";
    ground
        .write_all(&framer.frame(command).expect("frame"))
        .expect("ground write");
    let on_wire = framer.frame(command).expect("frame");
    assert_eq!(read_n(&mut flight, on_wire.len()), on_wire.as_ref());
    let handshake = routed(&framer, &handshake_frame(command));
    assert_eq!(read_n(&mut ground, handshake.len()), handshake);

    // Flight hanging up is a fatal wire failure.
    drop(flight);
    let status = wait_for_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(3));

    let mut stdout = String::new();
    child
        .stdout
        .take()
        .expect("stdout should be piped")
        .read_to_string(&mut stdout)
        .expect("stdout should be readable");
    let stats: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("stats should be json");
    assert_eq!(stats["downlink"]["frames_sent"], 2);
    assert_eq!(stats["downlink"]["loopback_frames"], 1);
    assert_eq!(stats["uplink"]["packets_written"], 1);
    assert_eq!(stats["uplink"]["handshakes"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_without_ground_fails_fast() {
    let port = TcpListener::bind("127.0.0.1:0")
        .expect("bind")
        .local_addr()
        .expect("addr")
        .port();

    let output = Command::new(env!("CARGO_BIN_EXE_gdslink"))
        .args(["--log-level", "error", "run", "--ground-addr"])
        .arg(format!("127.0.0.1:{port}"))
        .output()
        .expect("run command should execute");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ground open failed"), "stderr: {stderr}");
}

#[test]
fn decode_prints_every_frame_in_capture() {
    let dir = unique_temp_dir("decode");
    let capture = dir.join("capture.bin");
    let framer = FprimeFramer::new();

    let mut bytes = b"\x13\x37".to_vec();
    bytes.extend_from_slice(&framer.frame(b"\x00\x00\x00\x01chan").expect("frame"));
    bytes.extend_from_slice(&framer.frame(b"\x00\x00\x00\x02event").expect("frame"));
    bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE]);
    std::fs::write(&capture, &bytes).expect("capture should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_gdslink"))
        .args(["--log-level", "error", "--format", "json", "decode"])
        .arg(&capture)
        .output()
        .expect("decode should execute");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let frames: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["descriptor_name"], "TELEM");
    assert_eq!(frames[1]["descriptor_name"], "LOG");
    assert_eq!(frames[1]["size"], 9);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_rejects_capture_without_frames() {
    let dir = unique_temp_dir("decode-empty");
    let capture = dir.join("noise.bin");
    std::fs::write(&capture, b"no frames in here").expect("capture should be writable");

    let status = Command::new(env!("CARGO_BIN_EXE_gdslink"))
        .args(["--log-level", "error", "--format", "json", "decode"])
        .arg(&capture)
        .status()
        .expect("decode should execute");
    assert_eq!(status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_reports_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_gdslink"))
        .arg("version")
        .output()
        .expect("version should execute");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("gdslink {}", env!("CARGO_PKG_VERSION"))
    );
}
