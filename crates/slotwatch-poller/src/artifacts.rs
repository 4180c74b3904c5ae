//! Timestamped screenshots and CAPTCHA debug samples.

use slotwatch_browser::{BrowserActions, BrowserError};
use slotwatch_core::Timestamp;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Why a full-page screenshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Slots were offered
    AppointmentFound,
    /// Page said there was nothing available
    NoAppointment,
    /// The cycle failed
    Error,
}

impl ArtifactKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::AppointmentFound => "appointment-found",
            Self::NoAppointment => "no-appointment",
            Self::Error => "error",
        }
    }
}

/// Writes artifacts under the screenshot directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where CAPTCHA samples go.
    #[must_use]
    pub fn captcha_debug_dir(&self) -> PathBuf {
        self.dir.join("captcha-debug")
    }

    /// Fresh path for a screenshot of the given kind.
    #[must_use]
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.dir
            .join(format!("{}-{}.png", kind.prefix(), Timestamp::now().file_stamp()))
    }

    /// Save a full-page screenshot and return its path.
    pub async fn save_page<B>(&self, page: &B, kind: ArtifactKind) -> Result<PathBuf, BrowserError>
    where
        B: BrowserActions + ?Sized,
    {
        let path = self.path_for(kind);
        page.save_screenshot(&path).await?;
        Ok(path)
    }

    /// Save raw CAPTCHA bytes as `<name>-<stamp>.png` in the debug directory.
    pub fn save_captcha_sample(&self, name: &str, png: &[u8]) -> io::Result<PathBuf> {
        let dir = self.captcha_debug_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{name}-{}.png", Timestamp::now().file_stamp()));
        fs::write(&path, png)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_carry_kind_prefix() {
        let store = ArtifactStore::new("shots");
        for (kind, prefix) in [
            (ArtifactKind::AppointmentFound, "appointment-found-"),
            (ArtifactKind::NoAppointment, "no-appointment-"),
            (ArtifactKind::Error, "error-"),
        ] {
            let path = store.path_for(kind);
            assert_eq!(path.parent(), Some(Path::new("shots")));
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(prefix), "{name}");
            assert!(name.ends_with(".png"));
        }
    }

    #[test]
    fn test_captcha_sample_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store.save_captcha_sample("1-original", b"\x89PNG").unwrap();

        assert!(path.starts_with(dir.path().join("captcha-debug")));
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG");
    }
}
