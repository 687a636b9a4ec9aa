//! Runtime environment configuration.
//!
//! Small, env-var-driven surface: snapshot directory and cluster cookie.
//! No `config` crate - the surface is this small on purpose.

use std::path::PathBuf;

const SNAPSHOT_DIR_VAR: &str = "HACKBASE_SNAPSHOT_DIR";
const CLUSTER_COOKIE_VAR: &str = "HACKBASE_CLUSTER_COOKIE";
const NODE_NAME_VAR: &str = "HACKBASE_NODE_NAME";
const DEFAULT_CLUSTER_COOKIE: &str = "hackbase-default-cookie";
const DEFAULT_SNAPSHOT_DIR: &str = "./data/hackbase";

/// The cluster cookie (shared secret) read from the environment when
/// running in distributed mode; falls back to a built-in default.
pub fn cluster_cookie() -> String {
    std::env::var(CLUSTER_COOKIE_VAR).unwrap_or_else(|_| DEFAULT_CLUSTER_COOKIE.to_string())
}

pub fn snapshot_dir() -> PathBuf {
    std::env::var(SNAPSHOT_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SNAPSHOT_DIR))
}

pub fn node_name() -> String {
    std::env::var(NODE_NAME_VAR).unwrap_or_else(|_| "local".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_cookie_falls_back_to_default_when_unset() {
        std::env::remove_var(CLUSTER_COOKIE_VAR);
        assert_eq!(cluster_cookie(), DEFAULT_CLUSTER_COOKIE);
    }
}
