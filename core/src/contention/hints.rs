use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::graph::WorkItem;

lazy_static! {
    /// `path/to/file.rs` style inline code spans.
    static ref BACKTICK_RE: Regex = Regex::new(r"`([^`\s]+)`").unwrap();

    /// `File: src/app.ts`, `**Path**: src/`, `- Location: lib/x.py:12`.
    static ref FILE_MARKER_RE: Regex = Regex::new(
        r"(?mi)^\s*(?:[-*]\s+)?(?:\*\*)?(?:file|path|location)s?(?:\*\*)?\s*:\s*(?:\*\*)?\s*`?([^\s`,]+)`?"
    )
    .unwrap();

    /// Bare `dir/file.ext` tokens anywhere in prose (at least one `/`).
    static ref PATH_WITH_EXT_RE: Regex = Regex::new(
        r#"(?:^|[\s(\["'])((?:\.{1,2}/)?(?:[\w.-]+/)+[\w.-]+\.[A-Za-z0-9]{1,10})(?::\d+(?::\d+)?)?"#
    )
    .unwrap();

    static ref LINE_SUFFIX_RE: Regex = Regex::new(r"(?::\d+(?:[-:]\d+)*|#L\d+(?:-L?\d+)?)$").unwrap();

    static ref PATH_CHARS_RE: Regex = Regex::new(r"^[\w./-]+$").unwrap();
}

/// Extensions accepted for bare file names (no directory component).
const KNOWN_EXTENSIONS: &[&str] = &[
    "c", "cc", "cfg", "cpp", "css", "go", "h", "hpp", "html", "ini", "java", "js", "json", "jsx",
    "kt", "lock", "md", "py", "rb", "rs", "scss", "sh", "sql", "svelte", "swift", "toml", "ts",
    "tsx", "txt", "vue", "yaml", "yml",
];

/// Files and directories an item is expected to touch.
///
/// Heuristic only: used to keep likely-conflicting items out of the same
/// sub-wave, never for correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileHints {
    pub files: BTreeSet<String>,
    pub directories: BTreeSet<String>,
}

impl FileHints {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_directories<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directories.extend(dirs.into_iter().map(Into::into));
        self
    }

    fn add_candidate(&mut self, raw: &str, allow_bare_dir: bool) {
        let Some(path) = normalize_path(raw) else {
            return;
        };

        if let Some(dir) = path.strip_suffix('/') {
            if !dir.is_empty() {
                self.directories.insert(dir.to_string());
            }
            return;
        }

        let (parent, name) = match path.rsplit_once('/') {
            Some((parent, name)) => (Some(parent), name),
            None => (None, path.as_str()),
        };

        match extension_of(name) {
            Some(ext) if parent.is_some() || KNOWN_EXTENSIONS.contains(&ext) => {
                self.files.insert(path.clone());
            }
            Some(_) => {}
            None if parent.is_some() && allow_bare_dir => {
                self.directories.insert(path.clone());
            }
            None => {}
        }
    }
}

/// Scan an item's description for path-like tokens.
pub fn extract_hints(item: &WorkItem) -> FileHints {
    extract_hints_from_text(&item.description)
}

pub fn extract_hints_from_text(text: &str) -> FileHints {
    let mut hints = FileHints::default();

    for cap in BACKTICK_RE.captures_iter(text) {
        hints.add_candidate(&cap[1], true);
    }
    for cap in FILE_MARKER_RE.captures_iter(text) {
        hints.add_candidate(&cap[1], true);
    }
    for cap in PATH_WITH_EXT_RE.captures_iter(text) {
        hints.add_candidate(&cap[1], false);
    }

    hints
}

/// Normalise a raw token: drop trailing punctuation and line-number
/// suffixes, strip `./`. Returns `None` for anything that is not a plain
/// relative or absolute path (URLs, code, globs).
fn normalize_path(raw: &str) -> Option<String> {
    let token = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ')' | ']' | '}' | '"' | '\''))
        .trim_start_matches(|c: char| matches!(c, '(' | '[' | '{' | '"' | '\''));

    if token.contains("://") {
        return None;
    }

    let stripped = LINE_SUFFIX_RE.replace(token, "");
    if stripped.is_empty() || !PATH_CHARS_RE.is_match(&stripped) {
        return None;
    }

    let mut path: &str = &stripped;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    if path.is_empty() || path.chars().all(|c| c == '.' || c == '/') {
        return None;
    }
    Some(path.to_string())
}

/// Extension of a file name; dotfiles such as `.gitignore` count too.
fn extension_of(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// `path` equals `dir` or lives somewhere underneath it.
fn is_within(path: &str, dir: &str) -> bool {
    path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Whether two items are expected to touch the same paths.
pub fn overlaps_with(a: &FileHints, b: &FileHints) -> bool {
    if !a.files.is_disjoint(&b.files) {
        return true;
    }

    let dir_hits = |dirs: &BTreeSet<String>, other: &FileHints| {
        dirs.iter().any(|dir| {
            other.files.iter().any(|f| is_within(f, dir))
                || other
                    .directories
                    .iter()
                    .any(|d| is_within(d, dir) || is_within(dir, d))
        })
    };

    dir_hits(&a.directories, b) || dir_hits(&b.directories, a)
}

/// The specific paths responsible for an overlap, for diagnostics.
///
/// Exact file matches are reported as-is; nested directories report the
/// parent; a file inside the other side's directory reports the file.
pub fn get_overlapping_paths(a: &FileHints, b: &FileHints) -> BTreeSet<String> {
    let mut paths: BTreeSet<String> = a.files.intersection(&b.files).cloned().collect();

    for da in &a.directories {
        for db in &b.directories {
            if is_within(da, db) {
                paths.insert(db.clone());
            } else if is_within(db, da) {
                paths.insert(da.clone());
            }
        }
    }

    for (files, dirs) in [(&a.files, &b.directories), (&b.files, &a.directories)] {
        for file in files {
            if dirs.iter().any(|dir| is_within(file, dir)) {
                paths.insert(file.clone());
            }
        }
    }

    paths
}
