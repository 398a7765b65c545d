//! Utility functions for upload names and per-job file naming

use std::collections::HashSet;
use std::path::Path;

/// Reduce a client-supplied filename to a safe basename
///
/// Only the final path component is kept (both `/` and `\` count as separators)
/// and control characters are dropped. Names that end up empty, or consist only
/// of dots, are replaced by `upload-<index>`.
///
/// # Examples
///
/// ```
/// use ocr_batch::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd", 0), "passwd");
/// assert_eq!(sanitize_filename("C:\\scans\\page.png", 0), "page.png");
/// assert_eq!(sanitize_filename("..", 3), "upload-3");
/// ```
pub fn sanitize_filename(raw: &str, index: usize) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("upload-{index}")
    } else {
        cleaned.to_string()
    }
}

/// Pick a name not yet in `taken`, and reserve it
///
/// Returns `name` unchanged when it is free; otherwise tries `stem (1).ext`,
/// `stem (2).ext`, and so on.
///
/// # Examples
///
/// ```
/// use ocr_batch::utils::unique_name;
/// use std::collections::HashSet;
///
/// let mut taken = HashSet::new();
/// assert_eq!(unique_name("a.md", &mut taken), "a.md");
/// assert_eq!(unique_name("a.md", &mut taken), "a (1).md");
/// assert_eq!(unique_name("a.md", &mut taken), "a (2).md");
/// ```
pub fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let extension = path.extension().and_then(|e| e.to_str());

    let mut i = 1usize;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

/// Output filename for an input: `<input-stem>.md`
pub fn output_name(input_filename: &str) -> String {
    let stem = Path::new(input_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(input_filename);
    format!("{stem}.md")
}
