use std::path::PathBuf;
use url::Url;

/// File name used for directory-like paths
pub const INDEX_FILE: &str = "index.html";

/// Extension given to extension-less documents
const HTML_EXTENSION: &str = ".html";

/// Longest extension (dot included) that is treated as a real one
const MAX_EXTENSION_LEN: usize = 5;

/// Longest basename kept before truncation
const MAX_BASENAME_LEN: usize = 100;

/// Maps a URL to its path inside the mirror directory
///
/// # Mapping Rules
///
/// 1. Empty or `/`-terminated paths get `index.html`
/// 2. Paths whose last segment has no extension get `.html`
/// 3. Extensions longer than 5 characters (dot included) are not real
///    extensions and are replaced with `.html`
/// 4. Basenames longer than 100 characters are cut to 100 characters and
///    the extension is re-appended
/// 5. The result is `host[:port]/<directories>/<basename>`
///
/// The host segment keeps identical paths on different hosts apart.
///
/// # Examples
///
/// ```
/// use site_mirror::storage::local_path;
/// use std::path::PathBuf;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/path/to/page").unwrap();
/// assert_eq!(local_path(&url), PathBuf::from("example.com/path/to/page.html"));
///
/// let url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(local_path(&url), PathBuf::from("example.com/index.html"));
/// ```
pub fn local_path(url: &Url) -> PathBuf {
    let mut path = url.path().to_string();

    if path.is_empty() || path.ends_with('/') {
        path.push_str(INDEX_FILE);
    } else if extension(last_segment(&path)).is_empty() {
        path.push_str(HTML_EXTENSION);
    }

    let (dir, basename) = match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path.as_str()),
    };

    let mut basename = basename.to_string();
    let ext = extension(&basename).to_string();
    if ext.is_empty() {
        basename.push_str(HTML_EXTENSION);
    } else if ext.len() > MAX_EXTENSION_LEN {
        basename.truncate(basename.len() - ext.len());
        basename.push_str(HTML_EXTENSION);
    }

    if basename.chars().count() > MAX_BASENAME_LEN {
        let ext = extension(&basename).to_string();
        basename = basename.chars().take(MAX_BASENAME_LEN).collect();
        basename.push_str(&ext);
    }

    let mut local = PathBuf::from(host_dir(url));
    for segment in dir.split('/') {
        // The url crate already resolved dot segments; skip what is left
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        local.push(segment);
    }
    local.push(basename);
    local
}

/// Directory name for a URL's host, port included when it is not the default
fn host_dir(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown-host");
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns the extension of a file name including its dot, or "" if none
fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}
