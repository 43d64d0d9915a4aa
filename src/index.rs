//! Title/id lookup over one root-folder listing.

use std::collections::HashMap;

use crate::models::RemoteFile;

/// Immutable snapshot of a folder listing with title↔id maps.
///
/// Both maps are built in [`FileIndex::from_listing`] and never mutated
/// afterwards. Titles are not unique on Drive: for `by_title` the entry
/// seen last in the listing wins.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    entries: Vec<RemoteFile>,
    by_title: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

impl FileIndex {
    /// Build the snapshot from a listing, keeping listing order.
    pub fn from_listing(entries: Vec<RemoteFile>) -> Self {
        let mut by_title = HashMap::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());

        for file in &entries {
            by_title.insert(file.title.clone(), file.id.clone());
            by_id.insert(file.id.clone(), file.title.clone());
        }

        Self {
            entries,
            by_title,
            by_id,
        }
    }

    pub fn id_for_title(&self, title: &str) -> Option<&str> {
        self.by_title.get(title).map(String::as_str)
    }

    pub fn title_for_id(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// First folder in listing order titled `title`.
    pub fn folder_id(&self, title: &str) -> Option<&str> {
        self.folders()
            .find(|f| f.title == title)
            .map(|f| f.id.as_str())
    }

    /// Title of the folder with id `id`; `None` if the entry is not a folder.
    pub fn folder_title(&self, id: &str) -> Option<&str> {
        self.folders()
            .find(|f| f.id == id)
            .map(|f| f.title.as_str())
    }

    fn folders(&self) -> impl Iterator<Item = &RemoteFile> {
        self.entries.iter().filter(|f| f.is_folder())
    }

    /// Entries in the order the listing returned them.
    pub fn entries(&self) -> &[RemoteFile] {
        &self.entries
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of distinct titles.
    pub fn title_count(&self) -> usize {
        self.by_title.len()
    }
}
