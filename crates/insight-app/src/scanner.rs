//! Input scanning and loading

use insight_types::{Error, ImageTask, Result};
use insight_vision::{read_image, sniff_mime};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported image extensions
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Check if a path is a supported image file
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Scan a directory for image files, sorted by file name
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.display().to_string()));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && is_supported_image(path))
        .collect();

    images.sort_by_key(|path| file_name(path));

    Ok(images)
}

/// Expand directories and keep explicit files in the order given.
///
/// Explicit files are kept regardless of extension so that content
/// validation can reject them with a proper message.
pub fn scan_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            images.extend(scan_directory(path)?);
        } else if path.exists() {
            images.push(path.clone());
        } else {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
    }

    if images.is_empty() {
        return Err(Error::FileNotFound("no images found in the given paths".to_string()));
    }

    Ok(images)
}

/// Read an image from disk into an upload task, rejecting non-image content
pub fn load_task(path: &Path) -> Result<ImageTask> {
    let bytes = read_image(path)?;
    sniff_mime(&bytes)
        .map_err(|_| Error::InvalidImage(format!("{} is not a supported image", path.display())))?;
    Ok(ImageTask::new(file_name(path), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.JPEG")));
        assert!(is_supported_image(Path::new("test.png")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test")));
    }

    #[test]
    fn test_scan_directory_sorted() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), PNG_HEADER).unwrap();
        std::fs::write(dir.path().join("a.jpg"), PNG_HEADER).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let images = scan_directory(dir.path()).unwrap();
        let names: Vec<String> = images.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_scan_inputs_missing_path() {
        let err = scan_inputs(&[PathBuf::from("/nonexistent/crash.jpg")]).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_scan_inputs_empty_dir() {
        let dir = tempdir().unwrap();
        let err = scan_inputs(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_load_task() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.png");
        std::fs::write(&path, PNG_HEADER).unwrap();

        let task = load_task(&path).unwrap();
        assert_eq!(task.label, "scene.png");
        assert_eq!(task.bytes, PNG_HEADER);
    }

    #[test]
    fn test_load_task_rejects_text_disguised_as_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, "hello").unwrap();

        assert!(matches!(load_task(&path), Err(Error::InvalidImage(_))));
    }
}
