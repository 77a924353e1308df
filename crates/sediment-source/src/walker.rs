use std::path::{Path, PathBuf};

use sediment_core::SedimentError;

/// Maximum file size to process (1 MB).
const MAX_FILE_SIZE: u64 = 1_048_576;

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// Directories never worth scoring, independent of gitignore.
const SKIP_DIRS: [&str; 6] = [
    "node_modules",
    "target",
    "vendor",
    "dist",
    "build",
    "__pycache__",
];

/// A source file discovered during workspace walking.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use sediment_source::walker::{Language, SourceFile};
///
/// let file = SourceFile {
///     path: PathBuf::from("/repo/src/main.rs"),
///     relative_path: "src/main.rs".into(),
///     language: Language::Rust,
///     content: "fn main() {}\n".to_string(),
///     last_modified: 1_700_000_000,
/// };
/// assert_eq!(file.language, Language::Rust);
/// assert_eq!(file.loc(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the workspace root, forward slashes.
    pub relative_path: String,
    /// Detected programming language.
    pub language: Language,
    /// Full file content.
    pub content: String,
    /// mtime, unix seconds.
    pub last_modified: i64,
}

impl SourceFile {
    /// Non-empty line count.
    pub fn loc(&self) -> usize {
        self.content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
    }
}

/// Programming language detected from file extension.
///
/// # Examples
///
/// ```
/// use sediment_source::walker::Language;
///
/// assert_eq!(Language::from_extension("rs"), Language::Rust);
/// assert_eq!(Language::from_extension("py"), Language::Python);
/// assert_eq!(Language::from_extension("java"), Language::Java);
/// assert_eq!(Language::from_extension("c"), Language::C);
/// assert_eq!(Language::from_extension("cpp"), Language::Cpp);
/// assert_eq!(Language::from_extension("rb"), Language::Ruby);
/// assert_eq!(Language::from_extension("php"), Language::Php);
/// assert_eq!(Language::from_extension("kt"), Language::Kotlin);
/// assert_eq!(Language::from_extension("swift"), Language::Swift);
/// assert_eq!(Language::from_extension("txt"), Language::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Php,
    Kotlin,
    Swift,
    Unknown,
}

impl Language {
    /// Every supported language, `Unknown` excluded.
    pub const ALL: [Language; 12] = [
        Language::Rust,
        Language::Python,
        Language::TypeScript,
        Language::JavaScript,
        Language::Go,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::Ruby,
        Language::Php,
        Language::Kotlin,
        Language::Swift,
    ];

    /// Detect language from a file extension string (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "rs" => Language::Rust,
            "py" => Language::Python,
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" => Language::JavaScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Language::Cpp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            _ => Language::Unknown,
        }
    }

    /// Get the tree-sitter language grammar for this language.
    ///
    /// Returns `None` for `Language::Unknown`.
    pub fn tree_sitter_language(&self) -> Option<tree_sitter::Language> {
        match self {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
            Language::C => Some(tree_sitter_c::LANGUAGE.into()),
            Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            Language::Ruby => Some(tree_sitter_ruby::LANGUAGE.into()),
            Language::Php => Some(tree_sitter_php::LANGUAGE_PHP.into()),
            Language::Kotlin => Some(tree_sitter_kotlin_ng::LANGUAGE.into()),
            Language::Swift => Some(tree_sitter_swift::LANGUAGE.into()),
            Language::Unknown => None,
        }
    }

    /// Lowercase display name, e.g. `"rust"`.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Unknown => "unknown",
        }
    }
}

/// Languages whose grammar actually loads into a parser in this build.
///
/// Grammar crates lag the tree-sitter core; an ABI mismatch surfaces here
/// rather than as a mid-scan parse failure.
pub fn loadable_languages() -> Vec<Language> {
    let mut parser = tree_sitter::Parser::new();
    Language::ALL
        .iter()
        .copied()
        .filter(|lang| {
            lang.tree_sitter_language()
                .is_some_and(|grammar| parser.set_language(&grammar).is_ok())
        })
        .collect()
}

/// Walk filters: user exclude globs on top of the fixed skip list.
#[derive(Debug, Default)]
pub struct WalkOptions {
    exclude: Vec<glob::Pattern>,
}

impl WalkOptions {
    /// Compile exclude patterns, silently dropping any that fail to parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use sediment_source::walker::WalkOptions;
    ///
    /// let options = WalkOptions::from_patterns(&["generated/**".into(), "[".into()]);
    /// assert!(options.is_excluded("generated/schema.rs"));
    /// assert!(!options.is_excluded("src/main.rs"));
    /// ```
    pub fn from_patterns(patterns: &[String]) -> Self {
        let mut exclude = Vec::new();
        for pat in patterns {
            if let Ok(p) = glob::Pattern::new(pat) {
                exclude.push(p);
            }
        }
        Self { exclude }
    }

    /// Whether `relative_path` matches any exclude pattern.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(relative_path))
    }
}

/// Walk a workspace, respecting `.gitignore`, returning scoreable source files.
///
/// Skips binary files, files larger than 1 MB, files with unknown
/// extensions, the fixed dependency/build directories, and anything
/// matching the configured exclude globs. Returned files carry both the
/// absolute and the root-relative path.
///
/// # Errors
///
/// Returns [`SedimentError::Workspace`] if `root` is not a directory.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use sediment_source::walker::{walk_workspace, WalkOptions};
///
/// let files = walk_workspace(Path::new("."), &WalkOptions::default()).unwrap();
/// for f in &files {
///     println!("{}: {:?}", f.relative_path, f.language);
/// }
/// ```
pub fn walk_workspace(
    root: &Path,
    options: &WalkOptions,
) -> Result<Vec<SourceFile>, SedimentError> {
    if !root.is_dir() {
        return Err(SedimentError::Workspace(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let walker = ignore::WalkBuilder::new(root).build();
    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        if let Some(file) = load_source_file(root, entry.path(), options) {
            files.push(file);
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

/// Load a single file through the same filters as [`walk_workspace`].
///
/// Returns `None` when the file is missing, unreadable, binary, too
/// large, in a skipped directory, excluded, or not a known language.
pub fn load_source_file(root: &Path, path: &Path, options: &WalkOptions) -> Option<SourceFile> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let relative = relative_path(&path, root)?;
    if in_skipped_dir(&relative) || options.is_excluded(&relative) {
        return None;
    }

    let ext = path.extension().and_then(|e| e.to_str())?;
    let language = Language::from_extension(ext);
    if language == Language::Unknown {
        return None;
    }

    let metadata = std::fs::metadata(&path).ok()?;
    if !metadata.is_file() || metadata.len() > MAX_FILE_SIZE {
        return None;
    }

    let content = std::fs::read_to_string(&path).ok()?;

    // Binary check: null bytes in the first 8KB
    let check_len = content.len().min(BINARY_CHECK_SIZE);
    if content.as_bytes()[..check_len].contains(&0) {
        return None;
    }

    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64);

    Some(SourceFile {
        path,
        relative_path: relative,
        language,
        content,
        last_modified,
    })
}

fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let text = relative.to_string_lossy().replace('\\', "/");
    if text.is_empty() {
        return None;
    }
    Some(text)
}

fn in_skipped_dir(relative_path: &str) -> bool {
    relative_path
        .split('/')
        .any(|component| SKIP_DIRS.contains(&component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_temp_workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("src/app.py"), "def hello(): pass\n").unwrap();
        fs::write(root.join("src/app.ts"), "function run() {}\n").unwrap();
        fs::write(root.join("src/util.js"), "const x = 1;\n").unwrap();
        fs::write(root.join("src/main.go"), "package main\n").unwrap();

        // Unknown extensions are skipped
        fs::write(root.join("README.md"), "# Hello\n").unwrap();
        fs::write(root.join("data.csv"), "a,b,c\n").unwrap();

        dir
    }

    #[test]
    fn walk_finds_known_language_files() {
        let dir = make_temp_workspace();
        let files = walk_workspace(dir.path(), &WalkOptions::default()).unwrap();
        assert_eq!(files.len(), 5);
        assert!(files.iter().all(|f| f.language != Language::Unknown));
        assert!(files.iter().any(|f| f.relative_path == "src/main.rs"));
        assert!(!files.iter().any(|f| f.relative_path == "README.md"));
    }

    #[test]
    fn walk_returns_sorted_relative_paths() {
        let dir = make_temp_workspace();
        let files = walk_workspace(dir.path(), &WalkOptions::default()).unwrap();
        for pair in files.windows(2) {
            assert!(pair[0].relative_path <= pair[1].relative_path);
        }
        assert!(files[0].path.is_absolute());
    }

    #[test]
    fn walk_respects_gitignore() {
        let dir = make_temp_workspace();
        let root = dir.path();
        // A .git dir makes the ignore crate honor .gitignore
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".gitignore"), "ignored/\n").unwrap();
        fs::create_dir_all(root.join("ignored")).unwrap();
        fs::write(root.join("ignored/secret.rs"), "fn hidden() {}\n").unwrap();

        let files = walk_workspace(root, &WalkOptions::default()).unwrap();
        assert!(!files
            .iter()
            .any(|f| f.relative_path.starts_with("ignored/")));
    }

    #[test]
    fn walk_skips_dependency_directories() {
        let dir = make_temp_workspace();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "module.exports = 1;\n").unwrap();
        fs::create_dir_all(root.join("sub/__pycache__")).unwrap();
        fs::write(root.join("sub/__pycache__/mod.py"), "x = 1\n").unwrap();

        let files = walk_workspace(root, &WalkOptions::default()).unwrap();
        assert!(!files.iter().any(|f| f.relative_path.contains("node_modules")));
        assert!(!files.iter().any(|f| f.relative_path.contains("__pycache__")));
    }

    #[test]
    fn walk_honors_exclude_globs() {
        let dir = make_temp_workspace();
        let root = dir.path();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("generated/schema.rs"), "pub struct S;\n").unwrap();

        let options = WalkOptions::from_patterns(&["generated/**".into()]);
        let files = walk_workspace(root, &options).unwrap();
        assert!(!files
            .iter()
            .any(|f| f.relative_path.starts_with("generated/")));
    }

    #[test]
    fn walk_skips_binary_and_oversized_files() {
        let dir = make_temp_workspace();
        let root = dir.path();
        fs::write(root.join("src/blob.rs"), b"fn x() {}\0\0binary".as_slice()).unwrap();
        let big = "// padding\n".repeat(120_000);
        fs::write(root.join("src/huge.rs"), big).unwrap();

        let files = walk_workspace(root, &WalkOptions::default()).unwrap();
        assert!(!files.iter().any(|f| f.relative_path == "src/blob.rs"));
        assert!(!files.iter().any(|f| f.relative_path == "src/huge.rs"));
    }

    #[test]
    fn load_source_file_resolves_relative_input() {
        let dir = make_temp_workspace();
        let file = load_source_file(
            dir.path(),
            Path::new("src/main.rs"),
            &WalkOptions::default(),
        )
        .expect("should load");
        assert_eq!(file.relative_path, "src/main.rs");
        assert_eq!(file.language, Language::Rust);
        assert!(file.last_modified > 0);
    }

    #[test]
    fn load_source_file_returns_none_for_missing_or_foreign_paths() {
        let dir = make_temp_workspace();
        assert!(load_source_file(
            dir.path(),
            Path::new("src/vanished.rs"),
            &WalkOptions::default()
        )
        .is_none());
        // A path outside the workspace root never loads
        assert!(load_source_file(
            dir.path(),
            Path::new("/etc/hostname"),
            &WalkOptions::default()
        )
        .is_none());
    }

    #[test]
    fn loc_counts_non_empty_lines() {
        let file = SourceFile {
            path: PathBuf::from("/r/a.rs"),
            relative_path: "a.rs".into(),
            language: Language::Rust,
            content: "fn a() {}\n\n   \nfn b() {}\n".into(),
            last_modified: 0,
        };
        assert_eq!(file.loc(), 2);
    }

    #[test]
    fn every_bundled_grammar_loads() {
        let loaded = loadable_languages();
        assert_eq!(loaded.len(), Language::ALL.len());
        assert!(!loaded.contains(&Language::Unknown));
    }
}
