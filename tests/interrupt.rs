//! The SIGINT handler can be installed once per process, so every scenario
//! runs from a single test.

use nix::sys::signal::{Signal, kill};
use nix::unistd::getpid;
use smash::{Interpreter, signals};
use std::thread;
use std::time::{Duration, Instant};

/// Deliver SIGINT to this process after each delay, measured from now.
fn interrupt_after(delays: &[u64]) -> thread::JoinHandle<()> {
    let delays = delays.to_vec();
    thread::spawn(move || {
        let start = Instant::now();
        for ms in delays {
            let at = Duration::from_millis(ms);
            thread::sleep(at.saturating_sub(start.elapsed()));
            kill(getpid(), Signal::SIGINT).expect("raise SIGINT");
        }
    })
}

fn timed(sh: &mut Interpreter, line: &str, delays: &[u64]) -> Duration {
    let interrupts = interrupt_after(delays);
    let start = Instant::now();
    sh.execute_line(line).unwrap();
    let elapsed = start.elapsed();
    interrupts.join().unwrap();
    elapsed
}

#[test]
fn test_interrupt_cancels_foreground_work() {
    let mut sh = Interpreter::default();
    signals::install(sh.env().foreground.clone()).unwrap();

    let elapsed = timed(&mut sh, "sleep 5", &[500]);
    assert!(elapsed < Duration::from_secs(3), "plain command took {elapsed:?}");

    let elapsed = timed(&mut sh, "sleep 5 | cat", &[500]);
    assert!(elapsed < Duration::from_secs(3), "pipe took {elapsed:?}");

    // The second interrupt lands while the nested pipe on the right is
    // being waited on.
    let elapsed = timed(&mut sh, "sleep 5 | sleep 5 | cat", &[500, 1000]);
    assert!(elapsed < Duration::from_secs(3), "nested pipe took {elapsed:?}");

    assert!(sh.env().foreground.get().is_none());
    assert!(sh.env().jobs.is_empty());
}
