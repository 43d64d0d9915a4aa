//! Tests for pulling Drive ids out of links.

use drive_index::url_parser::extract_id;

mod drive_links {
    use super::*;

    #[test]
    fn folder_link() {
        let url = "https://drive.google.com/drive/folders/1abc123XYZ-_def456";
        assert_eq!(extract_id(url).unwrap(), "1abc123XYZ-_def456");
    }

    #[test]
    fn folder_link_with_account_index() {
        let url = "https://drive.google.com/drive/u/0/folders/1abc123XYZ?usp=sharing";
        assert_eq!(extract_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn file_view_link() {
        let url = "http://drive.google.com/file/d/1abc123XYZ/view?usp=drive_link";
        assert_eq!(extract_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn open_and_uc_links() {
        assert_eq!(
            extract_id("https://drive.google.com/open?id=1abc123XYZ").unwrap(),
            "1abc123XYZ"
        );
        assert_eq!(
            extract_id("https://drive.google.com/uc?id=1abc123XYZ&export=download").unwrap(),
            "1abc123XYZ"
        );
    }
}

mod docs_links {
    use super::*;

    #[test]
    fn document_spreadsheet_presentation() {
        for kind in ["document", "spreadsheets", "presentation"] {
            let url = format!("https://docs.google.com/{}/d/1docID_-x/edit#gid=0", kind);
            assert_eq!(extract_id(&url).unwrap(), "1docID_-x");
        }
    }
}

mod raw_ids {
    use super::*;

    #[test]
    fn plain_and_padded() {
        assert_eq!(extract_id("abc-123_XYZ").unwrap(), "abc-123_XYZ");
        assert_eq!(extract_id("\t1abc123XYZ \n").unwrap(), "1abc123XYZ");
    }

    #[test]
    fn rejects_non_drive_input() {
        assert!(extract_id("").is_err());
        assert!(extract_id("   ").is_err());
        assert!(extract_id("https://drive.google.com/drive/my-drive").is_err());
        assert!(extract_id("id with spaces").is_err());
    }

    #[test]
    fn error_names_the_input() {
        let err = extract_id("bad input!").unwrap_err();
        assert!(err.to_string().contains("bad input!"));
    }
}
