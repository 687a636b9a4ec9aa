//! Load harness (§4.8) - drives concurrent creation against a fresh
//! in-process `AppState` and checks the serialization kernel's duplicate
//! detection and message-ordering invariants hold under contention.
//!
//! Phases: N teams, M participants per team, one project per team, K chat
//! messages per team. Every phase is a bounded parallel fan-out
//! (concurrency cap 50) with a per-task timeout of 10s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use domain_types::ProjectCategory;
use hackbase::{AppState, SnapshotStore};

const CONCURRENCY: usize = 50;
const TASK_TIMEOUT: Duration = Duration::from_secs(10);

fn team_name(i: usize) -> String {
    format!("harness-team-{i:04}")
}

async fn bounded<F, Fut>(count: usize, semaphore: &Arc<Semaphore>, make: F) -> usize
where
    F: Fn(usize) -> Fut,
    Fut: std::future::Future<Output = bool> + Send + 'static,
{
    let mut handles = Vec::with_capacity(count);
    for i in 0..count {
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let fut = make(i);
        handles.push(tokio::spawn(async move {
            let result = tokio::time::timeout(TASK_TIMEOUT, fut).await.unwrap_or(false);
            drop(permit);
            result
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap_or(false) {
            ok += 1;
        }
    }
    ok
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let n: usize = std::env::var("HACKBASE_HARNESS_N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);
    let m: usize = std::env::var("HACKBASE_HARNESS_M")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let k: usize = std::env::var("HACKBASE_HARNESS_K")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let dir = std::env::temp_dir().join(format!("hackbase-harness-{}", std::process::id()));
    let state = AppState::new(SnapshotStore::new(&dir), "load-harness");
    state.ensure_supervisor().await.expect("supervisor failed to start");

    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total_start = Instant::now();

    let phase_start = Instant::now();
    let teams_ok = bounded(n, &semaphore, |i| {
        let state = state.clone();
        async move {
            state
                .create_team(team_name(i), "load-test".to_string())
                .await
                .is_ok()
        }
    })
    .await;
    println!("phase teams: {teams_ok}/{n} ok in {:?}", phase_start.elapsed());

    let phase_start = Instant::now();
    let mut participant_jobs = Vec::with_capacity(n * m);
    for i in 0..n {
        for j in 0..m {
            participant_jobs.push((i, j));
        }
    }
    let participants_ok = bounded(participant_jobs.len(), &semaphore, |idx| {
        let state = state.clone();
        let (i, j) = participant_jobs[idx];
        async move {
            state
                .add_participant(
                    team_name(i),
                    format!("person-{i}-{j}"),
                    format!("person-{i}-{j}@example.test"),
                )
                .await
                .is_ok()
        }
    })
    .await;
    println!(
        "phase participants: {participants_ok}/{} ok in {:?}",
        n * m,
        phase_start.elapsed()
    );

    let phase_start = Instant::now();
    let projects_ok = bounded(n, &semaphore, |i| {
        let state = state.clone();
        async move {
            state
                .create_project(team_name(i), "load test project".to_string(), ProjectCategory::Educativo)
                .await
                .is_ok()
        }
    })
    .await;
    println!("phase projects: {projects_ok}/{n} ok in {:?}", phase_start.elapsed());

    let phase_start = Instant::now();
    let mut message_jobs = Vec::with_capacity(n * k);
    for i in 0..n {
        for j in 0..k {
            message_jobs.push((i, j));
        }
    }
    let messages_ok = bounded(message_jobs.len(), &semaphore, |idx| {
        let state = state.clone();
        let (i, j) = message_jobs[idx];
        async move {
            let room = team_name(i);
            if state.create_room(room.clone()).await.is_err() {
                // room_exists from a concurrent creator is fine
            }
            state
                .send_message(room, format!("harness-{i}"), format!("message {j}"))
                .await
                .is_ok()
        }
    })
    .await;
    println!("phase messages: {messages_ok}/{} ok in {:?}", n * k, phase_start.elapsed());

    // Casts are fire-and-forget; let the chat server's mailbox drain.
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("total wall clock: {:?}", total_start.elapsed());

    let teams = state.list_teams().await.unwrap();
    let total_participants: usize = teams.iter().map(|t| t.participants.len()).sum();
    let projects = state.list_all_projects().await.unwrap();

    let mut total_messages = 0;
    for i in 0..n {
        total_messages += state.history(team_name(i)).await.unwrap_or_default().len();
    }

    println!(
        "invariants: teams={} (want {n}) participants={} (want {}) projects={} (want {n}) messages={} (want {})",
        teams.len(),
        total_participants,
        n * m,
        projects.len(),
        total_messages,
        n * k,
    );

    assert_eq!(teams.len(), n, "team count mismatch");
    assert_eq!(total_participants, n * m, "participant count mismatch");
    assert_eq!(projects.len(), n, "project count mismatch");
    assert_eq!(total_messages, n * k, "message count mismatch");

    println!("load harness: all invariants held");

    let _ = std::fs::remove_dir_all(&dir);
}
