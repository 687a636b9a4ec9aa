use hackbase::{runtime_env, AppState, SnapshotStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let snapshot_dir = runtime_env::snapshot_dir();
    let node_name = runtime_env::node_name();
    let cluster_cookie = runtime_env::cluster_cookie();
    tracing::info!(
        snapshot_dir = %snapshot_dir.display(),
        node_name = %node_name,
        cluster_cookie_len = cluster_cookie.len(),
        "starting hackbase"
    );

    let snapshots = SnapshotStore::new(snapshot_dir);
    let state = AppState::new(snapshots, node_name);

    // Force the supervisor (and therefore every registry, plus a chat
    // election attempt) to start before the CLI accepts input.
    if let Err(e) = state.ensure_supervisor().await {
        tracing::error!(error = %e, "failed to start application supervisor");
        std::process::exit(1);
    }

    if let Err(e) = hackbase::cli::run(state).await {
        tracing::error!(error = %e, "CLI exited with error");
        std::process::exit(1);
    }
}
