// Recent disk images list management
//
// Tracks recently mounted disk images for quick access.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default recent disks file path
const RECENT_DISKS_FILE: &str = "recent_disks.toml";

/// Maximum number of recent disk images to track
const MAX_RECENT_DISKS: usize = 10;

/// Recent disk images list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentDisksList {
    /// List of recent entries (most recent first)
    disks: Vec<RecentDiskEntry>,
}

/// Entry for a recently mounted disk image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentDiskEntry {
    /// Path to the disk image
    pub path: PathBuf,

    /// Last mounted timestamp
    pub last_mounted: String,

    /// Display name (file name without extension)
    pub display_name: String,
}

impl RecentDisksList {
    /// Create a new empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the list from file, or start empty
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Load the list from the default file
    pub fn load() -> io::Result<Self> {
        let text = fs::read_to_string(RECENT_DISKS_FILE)?;
        toml::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Save the list to the default file
    pub fn save(&self) -> io::Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(RECENT_DISKS_FILE, text)
    }

    /// Record a mount. Duplicates move to the front; the list is capped
    /// at [`MAX_RECENT_DISKS`].
    pub fn add<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref();

        self.disks.retain(|entry| entry.path != path);

        let display_name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        self.disks.insert(
            0,
            RecentDiskEntry {
                path: path.to_path_buf(),
                last_mounted: chrono::Local::now().to_rfc3339(),
                display_name,
            },
        );

        self.disks.truncate(MAX_RECENT_DISKS);
    }

    /// Entries, most recent first
    pub fn entries(&self) -> &[RecentDiskEntry] {
        &self.disks
    }

    /// Remove entries whose files no longer exist
    pub fn prune_missing(&mut self) {
        self.disks.retain(|entry| entry.path.exists());
    }

    /// Export the list as JSON (for external tooling)
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Import a list previously exported with
    /// [`export_json`](Self::export_json)
    pub fn import_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_moves_duplicates_to_front() {
        let mut list = RecentDisksList::new();
        list.add("a.d64");
        list.add("b.d64");
        list.add("a.d64");

        assert_eq!(list.entries().len(), 2);
        assert_eq!(list.entries()[0].path, PathBuf::from("a.d64"));
        assert_eq!(list.entries()[0].display_name, "a");
    }

    #[test]
    fn test_list_is_capped() {
        let mut list = RecentDisksList::new();
        for i in 0..15 {
            list.add(format!("disk{}.d64", i));
        }
        assert_eq!(list.entries().len(), MAX_RECENT_DISKS);
        assert_eq!(list.entries()[0].path, PathBuf::from("disk14.d64"));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut list = RecentDisksList::new();
        list.add("games.d64");

        let json = list.export_json().unwrap();
        let imported = RecentDisksList::import_json(&json).unwrap();
        assert_eq!(imported.entries().len(), 1);
        assert_eq!(imported.entries()[0].display_name, "games");
    }
}
