use nix::errno::Errno;
use nix::sys::signal;
use smash::{Interpreter, Settings};
use std::fs;
use std::thread;
use std::time::Duration;

fn read(path: &std::path::Path) -> String {
    fs::read_to_string(path).expect("read output file")
}

fn is_gone(pid: nix::unistd::Pid) -> bool {
    signal::kill(pid, None) == Err(Errno::ESRCH)
}

#[test]
fn test_background_command_is_listed_with_original_line() {
    let mut sh = Interpreter::default();
    sh.execute_line("sleep 30   &").unwrap();

    let job = sh.env().jobs.get_last_job().expect("job registered");
    assert_eq!(job.id(), 1);
    assert_eq!(job.command_line().text(), "sleep 30   &");
    assert!(job.command_line().is_background());

    sh.execute_line("quit kill").unwrap();
    assert!(sh.env().should_exit);
    assert!(sh.env().jobs.is_empty());
}

#[test]
fn test_kill_keeps_entry_until_next_line() {
    let mut sh = Interpreter::default();
    sh.execute_line("sleep 30 &").unwrap();
    let pid = sh.env().jobs.get_last_job().unwrap().pid();

    sh.execute_line("kill -9 1").unwrap();
    assert_eq!(sh.env().jobs.len(), 1);

    thread::sleep(Duration::from_millis(300));
    sh.execute_line("jobs").unwrap();
    assert!(sh.env().jobs.is_empty());
    assert!(is_gone(pid));
}

#[test]
fn test_kill_errors() {
    let mut sh = Interpreter::default();
    let err = sh.execute_line("kill -9 3").unwrap_err();
    assert_eq!(err.to_string(), "smash error: kill: job-id 3 does not exist");

    sh.execute_line("sleep 30&").unwrap();
    for line in ["kill 9 1", "kill -x 1", "kill -9", "kill -9 1 2"] {
        let err = sh.execute_line(line).unwrap_err();
        assert_eq!(err.to_string(), "smash error: kill: invalid arguments", "{line}");
    }
    assert_eq!(sh.env().jobs.len(), 1);
    sh.execute_line("quit kill").unwrap();
}

#[test]
fn test_fg_waits_for_the_job() {
    let mut sh = Interpreter::default();
    let err = sh.execute_line("fg").unwrap_err();
    assert_eq!(err.to_string(), "smash error: fg: jobs list is empty");

    sh.execute_line("sleep 0.3 &").unwrap();
    let pid = sh.env().jobs.get_last_job().unwrap().pid();
    sh.execute_line("fg 1").unwrap();

    assert!(sh.env().jobs.is_empty());
    assert!(sh.env().foreground.get().is_none());
    assert!(is_gone(pid));
}

#[test]
fn test_job_ids_are_not_reused() {
    let mut sh = Interpreter::default();
    sh.execute_line("sleep 30 &").unwrap();
    sh.execute_line("sleep 30 &").unwrap();
    sh.execute_line("kill -9 2").unwrap();
    thread::sleep(Duration::from_millis(300));
    sh.execute_line("sleep 30 &").unwrap();

    let ids: Vec<usize> = sh.env().jobs.iter().map(|job| job.id()).collect();
    assert_eq!(ids, vec![1, 3]);
    sh.execute_line("quit kill").unwrap();
}

#[test]
fn test_pipe_standard_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sh = Interpreter::default();
    sh.execute_line(&format!("echo hello | dd of={} status=none", out.display()))
        .unwrap();
    assert_eq!(read(&out), "hello\n");
}

#[test]
fn test_pipe_standard_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("err");
    let mut sh = Interpreter::default();
    sh.execute_line(&format!(
        "ls /nonexistent_smash_path |& dd of={} status=none",
        out.display()
    ))
    .unwrap();
    assert!(read(&out).contains("nonexistent_smash_path"));
}

#[test]
fn test_composites_ignore_background_marker() {
    let mut sh = Interpreter::default();
    sh.execute_line("true | true &").unwrap();
    assert!(sh.env().jobs.is_empty());
}

#[test]
fn test_wildcards_go_through_interpreter() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "").unwrap();
    fs::write(dir.path().join("b.txt"), "").unwrap();
    let out = dir.path().join("listing");

    let mut sh = Interpreter::with_settings(Settings {
        prompt: "smash".to_string(),
        interpreter: "/bin/sh".into(),
    });
    sh.execute_line(&format!(
        "ls {}/*.txt | dd of={} status=none",
        dir.path().display(),
        out.display()
    ))
    .unwrap();

    let listing = read(&out);
    assert!(listing.contains("a.txt"));
    assert!(listing.contains("b.txt"));
}

#[test]
fn test_chmod_sets_permission_bits() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("script.sh");
    fs::write(&file, "").unwrap();

    let mut sh = Interpreter::default();
    sh.execute_line(&format!("chmod 644 {}", file.display())).unwrap();
    let mode = fs::metadata(&file).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);

    let err = sh.execute_line(&format!("chmod 8 {}", file.display())).unwrap_err();
    assert_eq!(err.to_string(), "smash error: chmod: invalid arguments");
}

#[test]
fn test_unknown_program_does_not_stop_the_shell() {
    let mut sh = Interpreter::default();
    sh.execute_line("no-such-program-smash-test").unwrap();
    sh.execute_line("").unwrap();
    sh.execute_line("   &  ").unwrap();
    assert!(!sh.env().should_exit);
    assert!(sh.env().jobs.is_empty());
}

#[test]
fn test_jobs_listing_through_a_pipe() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("jobs");
    let mut sh = Interpreter::default();
    sh.execute_line("sleep 30 &").unwrap();

    sh.execute_line(&format!("jobs | dd of={} status=none", out.display()))
        .unwrap();
    assert_eq!(read(&out), "[1] sleep 30 &\n");
    assert_eq!(sh.env().jobs.len(), 1);

    sh.execute_line("quit kill").unwrap();
}
