//! Optional "print to PDF" through a locally installed Chrome or Chromium.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use thiserror::Error;

pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

const MACOS_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

const WINDOWS_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

const EXECUTABLE_NAMES: &[&str] = &["google-chrome", "chromium-browser", "chromium", "chrome"];

/// New headless mode first, then the legacy flag for older browsers.
const HEADLESS_FLAGS: &[&str] = &["--headless=new", "--headless"];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Chrome/Chromium not found; set {CHROME_PATH_ENV} or install Chrome")]
    Unavailable,
    #[error("browser failed to render {url}: {message}")]
    Failed { url: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render_to_pdf(&self, url: &str, output: &Path) -> Result<(), RenderError>;
}

#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl ChromeRenderer {
    /// Renderer using whatever browser [`find_chrome_binary`] locates.
    pub fn discover() -> Self {
        Self::with_binary(find_chrome_binary())
    }

    pub fn with_binary(binary: Option<PathBuf>) -> Self {
        Self {
            binary,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    async fn run_once(
        &self,
        binary: &Path,
        headless: &str,
        url: &str,
        output: &Path,
    ) -> Result<(), String> {
        let mut command = tokio::process::Command::new(binary);
        command
            .arg(headless)
            .arg("--disable-gpu")
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?;
        let out = result.map_err(|err| err.to_string())?;
        if out.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&out.stderr);
            Err(format!("{} {}", out.status, stderr.trim()))
        }
    }
}

#[async_trait::async_trait]
impl PdfRenderer for ChromeRenderer {
    async fn render_to_pdf(&self, url: &str, output: &Path) -> Result<(), RenderError> {
        let binary = self.binary.as_deref().ok_or(RenderError::Unavailable)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut last = String::from("no headless mode attempted");
        for headless in HEADLESS_FLAGS {
            match self.run_once(binary, headless, url, output).await {
                Ok(()) => return Ok(()),
                Err(message) => {
                    engine_debug!("{} {} failed: {}", binary.display(), headless, message);
                    last = message;
                }
            }
        }
        engine_warn!("Chrome failed to render {}", url);
        Err(RenderError::Failed {
            url: url.to_string(),
            message: last,
        })
    }
}

/// Locate a browser: `CHROME_PATH`, then platform install paths, then `PATH`.
pub fn find_chrome_binary() -> Option<PathBuf> {
    locate_browser(
        env::var_os(CHROME_PATH_ENV),
        env::consts::OS,
        env::var_os("PATH"),
    )
}

fn locate_browser(
    env_override: Option<OsString>,
    os: &str,
    path_var: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(path) = env_override.map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
        engine_warn!("{} points at missing {}", CHROME_PATH_ENV, path.display());
    }

    let well_known = match os {
        "macos" => MACOS_PATHS,
        "windows" => WINDOWS_PATHS,
        _ => &[],
    };
    if let Some(found) = well_known.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Some(found);
    }

    let path_var = path_var?;
    let suffix = if os == "windows" { ".exe" } else { "" };
    EXECUTABLE_NAMES.iter().find_map(|name| {
        env::split_paths(&path_var)
            .map(|dir| dir.join(format!("{name}{suffix}")))
            .find(|candidate| candidate.is_file())
    })
}
