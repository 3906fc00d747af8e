use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

/// The three fixed sub-directories of the uploads root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Originals, // transient, emptied after processing
    Thumbs,
    Large,
}

impl StorageArea {
    pub const ALL: [StorageArea; 3] = [
        StorageArea::Originals,
        StorageArea::Thumbs,
        StorageArea::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Originals => "originals",
            StorageArea::Thumbs => "thumbs",
            StorageArea::Large => "large",
        }
    }
}

impl FromStr for StorageArea {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "originals" => Ok(StorageArea::Originals),
            "thumbs" => Ok(StorageArea::Thumbs),
            "large" => Ok(StorageArea::Large),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the uploads root and every storage area below it.
    pub async fn prepare(&self) -> std::io::Result<()> {
        for area in StorageArea::ALL {
            fs::create_dir_all(self.area_dir(area)).await?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn area_dir(&self, area: StorageArea) -> PathBuf {
        self.root.join(area.as_str())
    }

    pub fn path(&self, area: StorageArea, filename: &str) -> PathBuf {
        self.area_dir(area).join(filename)
    }

    /// Maps a request for `<area>/<filename>` onto disk, refusing anything that
    /// could escape the area directory.
    pub fn resolve(&self, area: &str, filename: &str) -> Option<PathBuf> {
        let area = area.parse::<StorageArea>().ok()?;
        if !is_plain_filename(filename) {
            return None;
        }
        Some(self.path(area, filename))
    }
}

/// URL path under which a stored file is served.
pub fn public_url(area: StorageArea, filename: &str) -> String {
    format!("/uploads/{}/{}", area, filename)
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !name.starts_with('.')
}
