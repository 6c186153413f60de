use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::CookieSet;
use crate::error::SolverError;

/// One browser family plus the rule for finding its executable.
#[derive(Debug, Clone)]
pub struct BrowserCandidate {
    pub name: &'static str,
    /// Explicit executable path. `None` lets the driver auto-detect.
    pub executable: Option<PathBuf>,
}

// Well-known Edge install locations, probed when Chrome is absent.
const EDGE_PATHS: &[&str] = &[
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/usr/bin/microsoft-edge",
    "/opt/microsoft/msedge/msedge",
];

/// Chrome first via driver auto-detection, then Edge at well-known paths.
pub fn default_candidates() -> Vec<BrowserCandidate> {
    let mut candidates = vec![BrowserCandidate {
        name: "chrome",
        executable: None,
    }];
    if let Some(path) = probe_paths(EDGE_PATHS) {
        candidates.push(BrowserCandidate {
            name: "edge",
            executable: Some(path),
        });
    }
    candidates
}

fn probe_paths(paths: &[&str]) -> Option<PathBuf> {
    paths
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
}

/// A headed browser plus the CDP plumbing needed to observe it.
///
/// Owns the full process lifecycle: launched by [`BrowserSession::launch_any`],
/// terminated by [`BrowserSession::close`]. The handle never leaves this
/// crate, so no caller can keep a window alive past its call.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
    user_data_dir: PathBuf,
}

impl BrowserSession {
    /// Try each candidate in order; the first successful launch wins.
    pub async fn launch_any(candidates: &[BrowserCandidate]) -> Result<Self, SolverError> {
        for candidate in candidates {
            match Self::launch(candidate).await {
                Ok(session) => {
                    info!(browser = candidate.name, "browser launched");
                    return Ok(session);
                }
                Err(e) => {
                    warn!(browser = candidate.name, error = %e, "browser failed to launch");
                }
            }
        }
        Err(SolverError::BrowserUnavailable)
    }

    async fn launch(candidate: &BrowserCandidate) -> Result<Self, SolverError> {
        let user_data_dir = temp_profile_dir()?;

        let mut builder = BrowserConfig::builder()
            .with_head()
            .user_data_dir(&user_data_dir);
        if let Some(path) = &candidate.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(SolverError::Driver)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SolverError::Driver(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                let _ = std::fs::remove_dir_all(&user_data_dir);
                return Err(SolverError::Driver(e.to_string()));
            }
        };

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir,
        })
    }

    pub async fn navigate(&self, url: &str) -> Result<(), SolverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SolverError::Driver(e.to_string()))?;
        Ok(())
    }

    /// Current rendered document, as the human sees it mid-challenge.
    pub async fn rendered_body(&self) -> Result<String, SolverError> {
        self.page
            .content()
            .await
            .map_err(|e| SolverError::Driver(e.to_string()))
    }

    /// Full cookie set of the active session, name to value. No filtering
    /// happens here; deciding which cookies matter is the caller's concern.
    pub async fn cookies(&self) -> Result<CookieSet, SolverError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| SolverError::Driver(e.to_string()))?;
        Ok(cookies.into_iter().map(|c| (c.name, c.value)).collect())
    }

    /// Terminate the browser and drop its temporary profile.
    pub async fn close(mut self) -> Result<(), SolverError> {
        let closed = self.browser.close().await;
        self.handler_task.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!(error = %e, dir = %self.user_data_dir.display(), "failed to remove browser profile dir");
        }
        closed.map_err(|e| SolverError::Driver(e.to_string()))?;
        Ok(())
    }
}

fn temp_profile_dir() -> Result<PathBuf, SolverError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SolverError::Driver(e.to_string()))?
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "roomlink-profile-{}-{}",
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).map_err(|e| SolverError::Driver(e.to_string()))?;
    Ok(dir)
}
