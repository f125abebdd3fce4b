//! Label presentation.
//!
//! A generated label is ephemeral: the PDF bytes are staged to disk only so
//! the platform's default viewer can open them for printing. When opening
//! is unavailable (headless session, no registered handler) the document
//! falls back to a plain file save in the working directory — degraded, but
//! never lost.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;

/// File name used when the label cannot be opened and is saved instead.
pub const FALLBACK_FILE: &str = "etiquettes.pdf";

/// Directory name under the system temp dir where labels are staged.
const STAGING_DIR: &str = "atelier-labels";

#[derive(Debug, Clone, Default)]
pub struct PresentOptions {
    /// Explicit destination; bypasses the open affordance entirely.
    pub output: Option<PathBuf>,
    /// Ask the platform to open the staged document.
    pub open: bool,
}

fn staged_path() -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    std::env::temp_dir()
        .join(STAGING_DIR)
        .join(format!("etiquette-{stamp}-{}.pdf", Uuid::new_v4()))
}

fn write_to(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Deliver the PDF to the user and return where it landed.
pub fn present(bytes: &[u8], options: &PresentOptions) -> Result<PathBuf> {
    if let Some(path) = &options.output {
        write_to(path, bytes)?;
        info!(path = %path.display(), "label written");
        return Ok(path.clone());
    }

    if options.open {
        let staged = staged_path();
        write_to(&staged, bytes)?;
        match webbrowser::open(&staged.to_string_lossy()) {
            Ok(()) => {
                info!(path = %staged.display(), "label opened for printing");
                return Ok(staged);
            }
            Err(e) => {
                warn!(error = %e, "could not open the label; saving instead");
            }
        }
    }

    let fallback = PathBuf::from(FALLBACK_FILE);
    write_to(&fallback, bytes)?;
    info!(path = %fallback.display(), "label saved");
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_output_path_is_honoured() {
        let dir = std::env::temp_dir().join(format!("atelier-test-{}", Uuid::new_v4()));
        let target = dir.join("labels").join("out.pdf");
        let options = PresentOptions {
            output: Some(target.clone()),
            open: true,
        };
        let written = present(b"%PDF-stub", &options).unwrap();
        assert_eq!(written, target);
        assert_eq!(fs::read(&target).unwrap(), b"%PDF-stub");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn staged_paths_are_unique() {
        assert_ne!(staged_path(), staged_path());
    }
}
