// Drives the compiled binary through a PTY: the real event loop, crossterm
// input handling and terminal restore.
//
// Requires a TTY (expectrl allocates one), so it is Unix-only and ignored by
// default. Run with `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn demo_quiz_can_be_cancelled_and_exited() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("kuis");
    let cmd = format!("{} --demo --no-save -u tester", bin.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    // start the first quiz and pick an answer
    p.send("\r")?;
    std::thread::sleep(Duration::from_millis(100));
    p.send("b")?;
    std::thread::sleep(Duration::from_millis(100));

    // ESC cancels the attempt, the second ESC leaves the picker
    p.send("\x1b")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("\x1b")?;

    p.expect(Eof)?;
    Ok(())
}
