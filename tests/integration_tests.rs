use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

fn stitch() -> Command {
    Command::cargo_bin("stitch").unwrap()
}

/// Fresh scratch directory for files a test writes.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stitch-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn runs_without_arguments() {
    stitch().assert().success();
}

#[test]
fn runs_hello_world() {
    stitch()
        .arg("run")
        .arg("tests/files/hw.asm")
        .assert()
        .success()
        .stdout(contains("Hello, world!\nHALT"))
        .stdout(contains("Halted"));
}

#[test]
fn runs_bare_path() {
    stitch()
        .arg("tests/files/hw.asm")
        .assert()
        .success()
        .stdout(contains("Hello, world!"));
}

#[test]
fn minimal_hides_status_lines() {
    stitch()
        .args(["run", "--minimal", "tests/files/hw.asm"])
        .assert()
        .success()
        .stdout("Hello, world!\nHALT\n");
}

#[test]
fn reads_piped_input() {
    stitch()
        .args(["run", "--minimal", "tests/files/echo.asm"])
        .write_stdin("abc\nxyz")
        .assert()
        .success()
        .stdout("ABCHALT\n");
}

#[test]
fn end_of_input_stops_reads() {
    stitch()
        .args(["run", "--minimal", "tests/files/echo.asm"])
        .write_stdin("ok")
        .assert()
        .success()
        .stdout("OKHALT\n");
}

#[test]
fn assembles_then_runs_object() {
    let dir = scratch("object");
    let obj = dir.join("hw.obj");
    stitch()
        .args(["asm", "tests/files/hw.asm", "-o"])
        .arg(&obj)
        .assert()
        .success()
        .stdout(contains("Saved"));

    let bytes = fs::read(&obj).unwrap();
    assert_eq!(bytes[..8], [0x00, 0x30, 0x02, 0xE0, 0x22, 0xF0, 0x25, 0xF0]);

    stitch()
        .args(["run", "--minimal"])
        .arg(&obj)
        .assert()
        .success()
        .stdout("Hello, world!\nHALT\n");
}

#[test]
fn later_files_overwrite_earlier() {
    stitch()
        .args([
            "run",
            "--minimal",
            "tests/files/hw.asm",
            "tests/files/data.asm",
        ])
        .assert()
        .success()
        .stdout("Patched!HALT\n");
}

#[test]
fn asm_continues_past_failures() {
    let dir = scratch("batch");
    for name in ["hw.asm", "bad.asm", "trap.asm"] {
        fs::copy(format!("tests/files/{name}"), dir.join(name)).unwrap();
    }
    stitch()
        .arg("asm")
        .arg(dir.join("hw.asm"))
        .arg(dir.join("bad.asm"))
        .arg(dir.join("trap.asm"))
        .assert()
        .failure()
        .stderr(contains("1 of 3 file(s) failed"));

    assert!(dir.join("hw.obj").exists());
    assert!(dir.join("trap.obj").exists());
    assert!(!dir.join("bad.obj").exists());
}

#[test]
fn reports_every_error() {
    stitch()
        .args(["check", "tests/files/bad.asm"])
        .assert()
        .failure()
        .stderr(contains("Error on line 2"))
        .stderr(contains("Error on line 3"))
        .stderr(contains("Error on line 4"))
        .stderr(contains("3 previous error(s)"));
}

#[test]
fn check_passes_good_file() {
    stitch()
        .args(["check", "tests/files/hw.asm"])
        .assert()
        .success()
        .stdout(contains("no errors found"));
}

#[test]
fn skips_unloadable_files() {
    let dir = scratch("skip");
    let odd = dir.join("odd.obj");
    fs::write(&odd, [0x00, 0x30, 0x25]).unwrap();
    stitch()
        .args(["run", "--minimal"])
        .arg(&odd)
        .arg("tests/files/hw.asm")
        .assert()
        .success()
        .stdout("Hello, world!\nHALT\n")
        .stderr(contains("not aligned to 16 bits"));
}

#[test]
fn fails_when_nothing_loads() {
    stitch()
        .args(["run", "tests/files/bad.asm"])
        .assert()
        .failure()
        .stderr(contains("No program could be loaded"));
}

#[test]
fn illegal_opcode_fails_run() {
    stitch()
        .args(["run", "--minimal", "tests/files/illegal.asm"])
        .assert()
        .failure()
        .stdout(contains("before\nILLEGAL OPCODE"))
        .stderr(contains("illegal opcode"));
}

#[test]
fn unknown_trap_is_ignored_by_default() {
    stitch()
        .args(["run", "--minimal", "tests/files/trap.asm"])
        .assert()
        .success()
        .stdout("HALT\n");

    stitch()
        .args(["run", "--minimal", "--features", "strict-traps"])
        .arg("tests/files/trap.asm")
        .assert()
        .failure()
        .stdout(contains("UNKNOWN TRAP VECTOR X30"));
}

#[test]
fn trace_logs_instructions() {
    stitch()
        .args(["run", "--minimal", "--features", "trace", "tests/files/trap.asm"])
        .assert()
        .success()
        .stderr(contains("x3000  xF030  TRAP x30"))
        .stderr(contains("x3001  xF025  HALT"));
}

#[test]
fn rejects_unknown_feature() {
    stitch()
        .args(["run", "--features", "turbo", "tests/files/hw.asm"])
        .assert()
        .failure()
        .stderr(contains("Unknown feature 'turbo'"));
}
