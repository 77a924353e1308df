use crate::walker::{Language, SourceFile};

/// Per-category smell counts for one file.
///
/// # Examples
///
/// ```
/// use sediment_source::smells::SmellCounts;
///
/// let counts = SmellCounts {
///     todo_fixme: 2,
///     magic_number: 3,
///     ..Default::default()
/// };
/// assert_eq!(counts.total(), 5);
/// assert_eq!(counts.details(), vec!["2 todo_fixme", "3 magic_number"]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmellCounts {
    /// TODO/FIXME/HACK/XXX markers in comments.
    pub todo_fixme: usize,
    /// Functions whose body exceeds 60 lines.
    pub god_function: usize,
    /// Lines nested deeper than 4 levels.
    pub deep_nesting: usize,
    /// Declarations with more than 5 parameters.
    pub long_param_list: usize,
    /// Numeric literals outside the conventional set on non-declaration lines.
    pub magic_number: usize,
    /// Catch blocks with an empty body.
    pub empty_catch: usize,
}

impl SmellCounts {
    /// Sum across all categories.
    pub fn total(&self) -> usize {
        self.todo_fixme
            + self.god_function
            + self.deep_nesting
            + self.long_param_list
            + self.magic_number
            + self.empty_catch
    }

    /// Normalized 0-100 density: `total / loc * 5000`, capped. Zero for
    /// empty files.
    pub fn raw_score(&self, loc: usize) -> f64 {
        if loc == 0 {
            return 0.0;
        }
        (self.total() as f64 / loc as f64 * 5000.0).min(100.0)
    }

    /// One `"<count> <category>"` string per nonzero category.
    pub fn details(&self) -> Vec<String> {
        let categories = [
            (self.todo_fixme, "todo_fixme"),
            (self.god_function, "god_function"),
            (self.deep_nesting, "deep_nesting"),
            (self.long_param_list, "long_param_list"),
            (self.magic_number, "magic_number"),
            (self.empty_catch, "empty_catch"),
        ];
        categories
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, name)| format!("{count} {name}"))
            .collect()
    }
}

/// Scan file text for common maintenance smells.
///
/// Line-by-line heuristics, deliberately cheap: the point is a density
/// signal across thousands of files, not a lint report. Brace-counted
/// languages get function-length tracking; Python nesting is inferred
/// from indentation.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use sediment_source::walker::{Language, SourceFile};
/// use sediment_source::smells::detect_smells;
///
/// let file = SourceFile {
///     path: PathBuf::from("example.ts"),
///     relative_path: "example.ts".into(),
///     language: Language::TypeScript,
///     content: "// TODO: remove\nlet x = 1;\n".to_string(),
///     last_modified: 0,
/// };
/// assert_eq!(detect_smells(&file).todo_fixme, 1);
/// ```
pub fn detect_smells(file: &SourceFile) -> SmellCounts {
    let language = file.language;
    let lines: Vec<&str> = file.content.lines().collect();
    let mut counts = SmellCounts::default();

    // Function body tracking for length detection
    let mut current_func_lines = 0;
    let mut in_function = false;
    let mut brace_depth = 0i32;
    let mut func_start_depth = 0i32;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if is_comment(trimmed, language) {
            let upper = trimmed.to_uppercase();
            if upper.contains("TODO")
                || upper.contains("FIXME")
                || upper.contains("HACK")
                || upper.contains("XXX")
            {
                counts.todo_fixme += 1;
            }
        }

        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;

        if is_function_declaration(trimmed, language) && !in_function {
            in_function = true;
            func_start_depth = brace_depth;
            current_func_lines = 0;
        }

        brace_depth += opens - closes;

        if in_function {
            current_func_lines += 1;
            if brace_depth <= func_start_depth && closes > 0 {
                if current_func_lines > 60 {
                    counts.god_function += 1;
                }
                in_function = false;
                current_func_lines = 0;
            }
        }

        if !trimmed.is_empty() && nesting_level(line) > 4 {
            counts.deep_nesting += 1;
        }

        if is_function_declaration(trimmed, language) && count_parameters(trimmed) > 5 {
            counts.long_param_list += 1;
        }

        if !trimmed.starts_with("const ")
            && !trimmed.starts_with("let ")
            && !trimmed.starts_with("var ")
            && !is_comment(trimmed, language)
        {
            counts.magic_number += count_magic_numbers(trimmed);
        }

        if trimmed.contains("catch") {
            if let Some(next_line) = lines.get(i + 1) {
                let next_trimmed = next_line.trim();
                if next_trimmed == "}" || next_trimmed.is_empty() {
                    counts.empty_catch += 1;
                }
            }
        }
    }

    // Python nesting comes from pure indentation, 4 spaces per level
    if language == Language::Python {
        counts.deep_nesting = 0;
        for line in &lines {
            if line.trim().is_empty() {
                continue;
            }
            let spaces = line.len() - line.trim_start().len();
            if spaces / 4 > 4 {
                counts.deep_nesting += 1;
            }
        }
    }

    counts
}

fn is_comment(line: &str, language: Language) -> bool {
    match language {
        Language::Python | Language::Ruby => line.starts_with('#'),
        _ => line.starts_with("//") || line.starts_with('*') || line.starts_with("/*"),
    }
}

fn is_function_declaration(line: &str, language: Language) -> bool {
    match language {
        Language::TypeScript | Language::JavaScript => {
            line.contains("function ")
                || line.contains("=> {")
                || line.contains("async ")
                || (line.contains('(')
                    && line.contains(')')
                    && line.contains('{')
                    && !line.starts_with("if")
                    && !line.starts_with("for")
                    && !line.starts_with("while")
                    && !line.starts_with("switch"))
        }
        Language::Python => line.starts_with("def ") || line.starts_with("async def "),
        Language::Go => line.starts_with("func "),
        Language::Rust => {
            line.starts_with("fn ")
                || line.starts_with("pub fn ")
                || line.starts_with("pub(crate) fn ")
                || line.starts_with("async fn ")
        }
        Language::Java => {
            (line.contains("public ")
                || line.contains("private ")
                || line.contains("protected ")
                || line.contains("static "))
                && line.contains('(')
                && line.contains('{')
        }
        _ => false,
    }
}

/// Approximate nesting from leading whitespace, 2 or 4 spaces per level.
fn nesting_level(line: &str) -> usize {
    let indent = line.len() - line.trim_start().len();
    if indent >= 4 {
        indent / 4
    } else {
        indent / 2
    }
}

fn count_parameters(line: &str) -> usize {
    if let Some(start) = line.find('(') {
        if let Some(end) = line.rfind(')') {
            if end > start {
                let params = &line[start + 1..end];
                if params.trim().is_empty() {
                    return 0;
                }
                return params.split(',').count();
            }
        }
    }
    0
}

fn count_magic_numbers(line: &str) -> usize {
    const ALLOWED: [f64; 5] = [0.0, 1.0, -1.0, 2.0, 100.0];
    line.split(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .filter_map(|word| word.parse::<f64>().ok())
        .filter(|num| !ALLOWED.contains(num))
        .count()
}
