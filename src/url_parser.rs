//! Accept Drive links wherever the CLI expects a file or folder id.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DriveError, Result};

/// Link shapes that carry an id, tried in order. Capture group 1 is the id.
static LINK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // drive.google.com/drive/folders/<id>, optionally under /u/<n>/
        r"^https?://drive\.google\.com/drive/(?:u/\d+/)?folders/([\w-]+)",
        // drive.google.com/file/d/<id>/...
        r"^https?://drive\.google\.com/file/d/([\w-]+)",
        // docs.google.com/{document,spreadsheets,presentation,forms}/d/<id>/...
        r"^https?://docs\.google\.com/(?:document|spreadsheets|presentation|forms)/d/([\w-]+)",
        // drive.google.com/open?id=<id> and drive.google.com/uc?id=<id>&export=download
        r"^https?://drive\.google\.com/(?:open|uc)\?(?:[^#]*&)?id=([\w-]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("link pattern must compile"))
    .collect()
});

static RAW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("id pattern must compile"));

/// Pull the Drive id out of a link, or validate a bare id.
///
/// `root` passes through unchanged since Drive accepts it as an id alias.
///
/// ```
/// use drive_index::url_parser::extract_id;
///
/// assert_eq!(extract_id("https://drive.google.com/file/d/1abc/view").unwrap(), "1abc");
/// assert_eq!(extract_id("1abc").unwrap(), "1abc");
/// ```
pub fn extract_id(url_or_id: &str) -> Result<String> {
    let input = url_or_id.trim();

    let from_link = LINK_PATTERNS
        .iter()
        .find_map(|re| re.captures(input).and_then(|c| c.get(1)));
    if let Some(id) = from_link {
        return Ok(id.as_str().to_string());
    }

    if RAW_ID.is_match(input) {
        return Ok(input.to_string());
    }

    Err(DriveError::InvalidUrlOrId(url_or_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_link() {
        let url = "https://drive.google.com/drive/u/1/folders/1abc_XYZ-9";
        assert_eq!(extract_id(url).unwrap(), "1abc_XYZ-9");
    }

    #[test]
    fn test_uc_link_with_leading_params() {
        let url = "https://drive.google.com/uc?export=download&id=1abc";
        assert_eq!(extract_id(url).unwrap(), "1abc");
    }

    #[test]
    fn test_root_alias() {
        assert_eq!(extract_id("root").unwrap(), "root");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(extract_id("").is_err());
        assert!(extract_id("not an id").is_err());
        assert!(extract_id("https://example.com/d/abc").is_err());
    }
}
