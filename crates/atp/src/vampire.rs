//! The three Vampire invocation modes and their process plumbing.
//!
//! Every operation spawns one short-lived external process with piped
//! stdio, feeds it a clause listing, and enforces a wall-clock deadline.
//! The prover runs in its own process group so that a deadline expiry can
//! kill everything it spawned (under `perf stat` the prover is a child of
//! the group leader, not our direct child).

use std::collections::HashSet;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use crate::clause::{parse_listing, Clause, Clausified, Role};
use crate::types::{AtpConfig, AtpError};

/// Substring of saturation output announcing a refutation.
pub const UNSAT_MARKER: &str = "SZS status Unsatisfiable";

/// Deadline for clause normalization. Clausification cost does not depend
/// on the search state, so this is fixed rather than configurable.
const CLAUSIFY_TIMEOUT: Duration = Duration::from_secs(1);

/// Run `vampire --mode clausify` on a problem file and partition the
/// emitted clauses by role.
pub async fn clausify(config: &AtpConfig, problem: &Path) -> Result<Clausified, AtpError> {
    let mut cmd = Command::new(&config.vampire_path);
    cmd.arg("--mode")
        .arg("clausify")
        .arg(problem)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let output = run_with_deadline(cmd, None, CLAUSIFY_TIMEOUT).await?;
    if !output.status.success() {
        return Err(AtpError::Crashed(format!(
            "clausify exited with {} for {}",
            output.status,
            problem.display()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let clausified = Clausified::partition(parse_listing(&text));
    tracing::debug!(
        problem = %problem.display(),
        axioms = clausified.axioms.len(),
        conjectures = clausified.conjectures.len(),
        extras = clausified.extras.len(),
        "Clausified problem"
    );
    Ok(clausified)
}

/// Measure the effort of refuting (axioms ∪ selected ∪ extras): a full
/// saturation run under `perf stat`, costed in retired instructions.
///
/// The prover's own output is discarded; only the counter summary on
/// stderr is read. Lower is better.
pub async fn score(
    config: &AtpConfig,
    axioms: &[Clause],
    selected: &[Clause],
    extras: &[Clause],
) -> Result<f64, AtpError> {
    let mut cmd = Command::new(&config.perf_path);
    cmd.arg("stat")
        .arg("-e")
        .arg("instructions:u")
        .arg("-x,")
        .arg(&config.vampire_path)
        .arg("-p")
        .arg("off")
        .arg("-av")
        .arg("off")
        .arg("-sa")
        .arg("discount")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let input = scoring_input(axioms, selected, extras);
    let deadline = Duration::from_millis(config.prover_timeout_ms);
    let output = run_with_deadline(cmd, Some(input), deadline).await?;
    if !output.status.success() {
        return Err(AtpError::Crashed(format!(
            "scoring run exited with {}",
            output.status
        )));
    }

    let count = parse_instruction_count(&output.stderr)?;
    Ok(count - config.startup_instructions)
}

/// Run one age-bounded generating round over `selected ∪ extras` and
/// return the clauses it produced that were not part of the input.
///
/// Surfaces [`AtpError::ProvedIt`] when the round itself refutes the set.
/// Returned clauses carry their observed roles; type declarations are
/// never returned (extras are not candidate actions).
pub async fn infer(
    config: &AtpConfig,
    selected: &[Clause],
    extras: &[Clause],
) -> Result<Vec<Clause>, AtpError> {
    let mut cmd = Command::new(&config.vampire_path);
    cmd.arg("-av")
        .arg("off")
        .arg("-sa")
        .arg("discount")
        .arg("-awr")
        .arg("1:0")
        .arg("--max_age")
        .arg("1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let input = inference_input(selected, extras);
    let deadline = Duration::from_millis(config.prover_timeout_ms);
    let output = run_with_deadline(cmd, Some(input), deadline).await?;
    if !output.status.success() {
        return Err(AtpError::Crashed(format!(
            "inference run exited with {}",
            output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    if text.contains(UNSAT_MARKER) {
        return Err(AtpError::ProvedIt);
    }

    let known: HashSet<&str> = selected.iter().chain(extras).map(Clause::body).collect();
    let fresh: Vec<Clause> = parse_listing(&text)
        .into_iter()
        .filter(|c| c.role() != Role::Type && !known.contains(c.body()))
        .collect();
    tracing::trace!(selected = selected.len(), fresh = fresh.len(), "Inference round");
    Ok(fresh)
}

/// Serialize one scoring invocation's stdin: extras first (sort
/// declarations must precede anything that mentions the sorts), then
/// selected most-recently-selected first, then remaining axioms in reverse
/// discovery order.
fn scoring_input(axioms: &[Clause], selected: &[Clause], extras: &[Clause]) -> Vec<u8> {
    let mut buf = String::new();
    for clause in extras {
        buf.push_str(&clause.wire());
    }
    for clause in selected.iter().rev() {
        buf.push_str(&clause.wire());
    }
    for clause in axioms.iter().rev() {
        buf.push_str(&clause.wire());
    }
    buf.into_bytes()
}

/// Stdin for an inference round: extras, then selected newest-first.
fn inference_input(selected: &[Clause], extras: &[Clause]) -> Vec<u8> {
    let mut buf = String::new();
    for clause in extras {
        buf.push_str(&clause.wire());
    }
    for clause in selected.iter().rev() {
        buf.push_str(&clause.wire());
    }
    buf.into_bytes()
}

/// Pull the retired-instruction count out of perf's CSV summary.
///
/// `perf stat -x,` writes `<count>,,instructions:u,...` to stderr; the
/// first comma-delimited field is the count, base 10.
fn parse_instruction_count(stderr: &[u8]) -> Result<f64, AtpError> {
    let text = String::from_utf8_lossy(stderr);
    let first = text.split(',').next().unwrap_or_default().trim();
    first.parse::<u64>().map(|n| n as f64).map_err(|_| {
        AtpError::Crashed(format!(
            "unreadable counter output: {:?}",
            text.lines().next().unwrap_or_default()
        ))
    })
}

/// Spawn the command in its own process group, feed it `input`, and wait
/// for it under `deadline`. On expiry the whole group is terminated, then
/// killed, before `Timeout` is returned — no process survives the call.
async fn run_with_deadline(
    mut cmd: Command,
    input: Option<Vec<u8>>,
    deadline: Duration,
) -> Result<Output, AtpError> {
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn()?;
    let pid = child.id();
    match tokio::time::timeout(deadline, communicate(child, input)).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            tracing::debug!(deadline_ms = deadline.as_millis() as u64, "Prover killed on deadline");
            Err(AtpError::Timeout(deadline.as_millis() as u64))
        }
    }
}

/// Write stdin (if any), close it so the prover sees EOF, and collect the
/// process output. Write errors are swallowed: a prover that dies mid-read
/// closes the pipe, and the exit status already reports that.
async fn communicate(mut child: Child, input: Option<Vec<u8>>) -> std::io::Result<Output> {
    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(mut stdin), Some(data)) = (stdin, input) {
            let _ = stdin.write_all(&data).await;
            let _ = stdin.shutdown().await;
        }
    };
    let (_, output) = tokio::join!(feed, child.wait_with_output());
    output
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let pgid = pid as libc::pid_t;
    unsafe {
        libc::killpg(pgid, libc::SIGTERM);
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
