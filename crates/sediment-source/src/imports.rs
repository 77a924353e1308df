use std::collections::HashMap;
use std::path::Path;

use crate::walker::{Language, SourceFile};

/// Workspace-wide import relationships.
///
/// Targets resolve to workspace files by stem match, so `import x from
/// './util'` links to `src/util.ts` without a module resolver. Fan-in
/// and fan-out degrees feed the coupling index; stem containment in
/// either direction answers whether a co-changing pair has a visible
/// structural reason.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    imports: HashMap<String, Vec<String>>,
    in_degree: HashMap<String, usize>,
    out_degree: HashMap<String, usize>,
    max_degree: usize,
}

impl ImportGraph {
    /// Build the graph over a walked file set.
    pub fn build(files: &[SourceFile]) -> Self {
        let mut imports: HashMap<String, Vec<String>> = HashMap::new();
        let mut out_degree: HashMap<String, usize> = HashMap::new();
        let mut in_degree: HashMap<String, usize> = HashMap::new();

        let stems: Vec<(String, String)> = files
            .iter()
            .map(|f| (f.relative_path.clone(), file_stem(&f.relative_path)))
            .collect();

        for file in files {
            let extracted = extract_imports(&file.content, file.language);
            out_degree.insert(file.relative_path.clone(), extracted.len());

            for import in &extracted {
                let target_stem = file_stem(import);
                if target_stem.is_empty() {
                    continue;
                }
                // First stem match wins
                for (other_rel, other_stem) in &stems {
                    if *other_stem == target_stem && *other_rel != file.relative_path {
                        *in_degree.entry(other_rel.clone()).or_insert(0) += 1;
                        break;
                    }
                }
            }

            imports.insert(file.relative_path.clone(), extracted);
        }

        let max_degree = imports
            .keys()
            .map(|f| {
                out_degree.get(f).copied().unwrap_or(0) + in_degree.get(f).copied().unwrap_or(0)
            })
            .max()
            .unwrap_or(0);

        Self {
            imports,
            in_degree,
            out_degree,
            max_degree,
        }
    }

    /// Fan-in plus fan-out for one file.
    pub fn degree(&self, relative_path: &str) -> usize {
        self.in_degree.get(relative_path).copied().unwrap_or(0)
            + self.out_degree.get(relative_path).copied().unwrap_or(0)
    }

    /// Highest degree across the workspace.
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Normalized 0-100 coupling index: `degree / (2 * max_degree)`.
    /// An unconnected workspace scores every file 0.
    pub fn raw_score(&self, relative_path: &str) -> f64 {
        if self.max_degree == 0 {
            return 0.0;
        }
        let degree = self.degree(relative_path);
        (degree as f64 / (2.0 * self.max_degree as f64) * 100.0).min(100.0)
    }

    /// Whether either file's imports reference the other's stem.
    pub fn linked(&self, a: &str, b: &str) -> bool {
        self.references(a, b) || self.references(b, a)
    }

    fn references(&self, from: &str, to: &str) -> bool {
        let stem = file_stem(to);
        if stem.is_empty() {
            return false;
        }
        self.imports
            .get(from)
            .map_or(false, |list| list.iter().any(|import| import.contains(&stem)))
    }
}

/// Extract import targets from source text, one pass per line.
///
/// # Examples
///
/// ```
/// use sediment_source::imports::extract_imports;
/// use sediment_source::walker::Language;
///
/// let imports = extract_imports("use crate::module::Type;\n", Language::Rust);
/// assert_eq!(imports, vec!["crate::module::Type"]);
/// ```
pub fn extract_imports(content: &str, language: Language) -> Vec<String> {
    let mut imports = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        match language {
            Language::Python => {
                if let Some(module) = python_import(trimmed) {
                    imports.push(module);
                }
            }
            Language::Rust => {
                if trimmed.starts_with("use ") || trimmed.starts_with("pub use ") {
                    let path = trimmed
                        .trim_start_matches("pub ")
                        .trim_start_matches("use ")
                        .trim_end_matches(';')
                        .split("::{")
                        .next()
                        .unwrap_or("")
                        .trim();
                    if !path.is_empty() {
                        imports.push(path.to_string());
                    }
                }
            }
            Language::Go => {
                // Inside import blocks the module path stands alone in quotes
                if trimmed.starts_with("import ") || trimmed.starts_with('"') {
                    if let Some(p) = quoted_import(trimmed) {
                        imports.push(p);
                    }
                }
            }
            _ => {
                if trimmed.starts_with("import ") || trimmed.contains("require(") {
                    if let Some(p) = quoted_import(trimmed) {
                        imports.push(p);
                    }
                }
            }
        }
    }
    imports
}

/// Last quoted string on the line, single or double quotes.
fn quoted_import(line: &str) -> Option<String> {
    if let Some(end) = line.rfind('\'') {
        if let Some(start) = line[..end].rfind('\'') {
            return Some(line[start + 1..end].to_string());
        }
    }
    if let Some(end) = line.rfind('"') {
        if let Some(start) = line[..end].rfind('"') {
            return Some(line[start + 1..end].to_string());
        }
    }
    None
}

fn python_import(line: &str) -> Option<String> {
    if line.starts_with("from ") {
        let mut parts = line.split_whitespace();
        parts.next();
        return parts.next().map(str::to_string);
    }
    if line.starts_with("import ") {
        let module = line.strip_prefix("import ")?.split(',').next()?.trim();
        return Some(module.to_string());
    }
    None
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
