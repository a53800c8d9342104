//! Manual override window: before certain automatic actions the operator
//! gets a short window to veto by touching a sentinel file.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLLS: u32 = 20; // 10 seconds total

/// Filesystem-sentinel approval gate: removes any stale `approve` marker,
/// then polls for up to 10 seconds for the operator to create one.
pub struct ManualOverride {
    dir: PathBuf,
}

impl ManualOverride {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn marker_path(&self) -> PathBuf {
        self.dir.join("approve")
    }

    /// Ask the operator for manual approval of `description`. Returns `true`
    /// only if the marker file appears within the window; always returns
    /// `false` and logs a warning if the sentinel directory can't be created.
    pub async fn request_approval(&self, description: &str) -> bool {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(target: "risk", error = %e, "failed to create manual override directory");
            return false;
        }

        let marker = self.marker_path();
        let _ = std::fs::remove_file(&marker);

        info!(
            target: "risk",
            action = description,
            path = %marker.display(),
            "⏸️ manual override window open: run `touch {}` inside the container to approve",
            marker.display(),
        );

        for _ in 0..MAX_POLLS {
            if marker.exists() {
                let _ = std::fs::remove_file(&marker);
                info!(target: "risk", action = description, "manual override approved");
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        info!(target: "risk", action = description, "manual override window expired without approval, blocking");
        false
    }
}
