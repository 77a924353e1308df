use sediment_core::SedimentError;
use tree_sitter::{Node, Parser};

use crate::walker::{Language, SourceFile};

/// Cyclomatic complexity of a single function.
///
/// # Examples
///
/// ```
/// use sediment_source::complexity::FunctionComplexity;
///
/// let func = FunctionComplexity {
///     name: "parse_header".into(),
///     complexity: 7,
///     line: 42,
/// };
/// assert_eq!(func.complexity, 7);
/// ```
#[derive(Debug, Clone)]
pub struct FunctionComplexity {
    /// Function or method name.
    pub name: String,
    /// Cyclomatic complexity (1 + branch points).
    pub complexity: u32,
    /// Line number where the function starts (1-indexed).
    pub line: u32,
}

/// Per-file complexity summary.
///
/// The normalized score blends the mean and the worst function, so a
/// file full of small helpers is not drowned out by one monster.
#[derive(Debug, Clone, Default)]
pub struct FileComplexity {
    /// Every function found in the file.
    pub functions: Vec<FunctionComplexity>,
    /// Mean complexity across functions.
    pub average: f64,
    /// Highest single-function complexity.
    pub max: u32,
}

impl FileComplexity {
    fn from_functions(functions: Vec<FunctionComplexity>) -> Self {
        if functions.is_empty() {
            return Self::default();
        }
        let total: u32 = functions.iter().map(|f| f.complexity).sum();
        let average = f64::from(total) / functions.len() as f64;
        let max = functions.iter().map(|f| f.complexity).max().unwrap_or(0);
        Self {
            functions,
            average,
            max,
        }
    }

    /// Normalized 0-100 score: `0.6 * average + 0.4 * max`, where 20
    /// effective complexity saturates the scale. Files with no
    /// functions score 0.
    pub fn raw_score(&self) -> f64 {
        if self.functions.is_empty() {
            return 0.0;
        }
        let effective = 0.6 * self.average + 0.4 * f64::from(self.max);
        (effective / 20.0 * 100.0).min(100.0)
    }

    /// The `n` most complex functions, formatted as `"name: N"`.
    pub fn hotspots(&self, n: usize) -> Vec<String> {
        let mut sorted: Vec<&FunctionComplexity> = self.functions.iter().collect();
        sorted.sort_by(|a, b| {
            b.complexity
                .cmp(&a.complexity)
                .then_with(|| a.line.cmp(&b.line))
        });
        sorted
            .into_iter()
            .take(n)
            .map(|f| format!("{}: {}", f.name, f.complexity))
            .collect()
    }
}

/// Compute cyclomatic complexity for every function in a source file.
///
/// Each function starts at 1 and gains a point per decision point:
/// conditionals, loops, match/switch arms, catch clauses, ternaries,
/// and short-circuit boolean operators. Nested functions are scored
/// on their own, not folded into the enclosing function.
///
/// Unparseable files return an empty [`FileComplexity`]. Tree-sitter is
/// error-tolerant, so files with syntax errors still yield partial results.
///
/// # Errors
///
/// Returns [`SedimentError::Parse`] if the language grammar cannot be loaded.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use sediment_source::walker::{Language, SourceFile};
/// use sediment_source::complexity::analyze_complexity;
///
/// let file = SourceFile {
///     path: PathBuf::from("example.rs"),
///     relative_path: "example.rs".into(),
///     language: Language::Rust,
///     content: "fn double(x: i32) -> i32 { x * 2 }".to_string(),
///     last_modified: 0,
/// };
/// let complexity = analyze_complexity(&file).unwrap();
/// assert_eq!(complexity.functions.len(), 1);
/// assert_eq!(complexity.functions[0].complexity, 1);
/// ```
pub fn analyze_complexity(file: &SourceFile) -> Result<FileComplexity, SedimentError> {
    let Some(ts_language) = file.language.tree_sitter_language() else {
        return Ok(FileComplexity::default());
    };

    let mut parser = Parser::new();
    parser
        .set_language(&ts_language)
        .map_err(|e| SedimentError::Parse(format!("failed to set language: {e}")))?;

    let Some(tree) = parser.parse(&file.content, None) else {
        return Ok(FileComplexity::default());
    };

    let source = file.content.as_bytes();
    let mut functions = Vec::new();
    collect_functions(tree.root_node(), source, file.language, &mut functions);

    Ok(FileComplexity::from_functions(functions))
}

fn collect_functions(
    node: Node,
    source: &[u8],
    language: Language,
    functions: &mut Vec<FunctionComplexity>,
) {
    if is_function_root(&node, language) {
        let name = function_name(&node, source, language)
            .unwrap_or_else(|| "<anonymous>".to_string());
        functions.push(FunctionComplexity {
            name,
            complexity: 1 + count_branches(node, language),
            line: node.start_position().row as u32 + 1,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_functions(child, source, language, functions);
    }
}

fn count_branches(node: Node, language: Language) -> u32 {
    let mut count = 0;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        // Nested function bodies are scored as their own functions
        if is_function_root(&child, language) {
            continue;
        }
        if is_branch(&child, language) {
            count += 1;
        }
        count += count_branches(child, language);
    }
    count
}

fn is_function_root(node: &Node, language: Language) -> bool {
    let kind = node.kind();
    match language {
        Language::Rust => kind == "function_item",
        Language::Python => kind == "function_definition",
        Language::TypeScript | Language::JavaScript => matches!(
            kind,
            "function_declaration" | "function_expression" | "method_definition" | "arrow_function"
        ),
        Language::Go => matches!(kind, "function_declaration" | "method_declaration"),
        Language::Java => matches!(kind, "method_declaration" | "constructor_declaration"),
        Language::C | Language::Cpp => kind == "function_definition",
        Language::Ruby => matches!(kind, "method" | "singleton_method"),
        Language::Php => matches!(kind, "function_definition" | "method_declaration"),
        Language::Kotlin => kind == "function_declaration",
        Language::Swift => kind == "function_declaration",
        Language::Unknown => false,
    }
}

fn is_branch(node: &Node, language: Language) -> bool {
    let kind = node.kind();
    match language {
        Language::Rust => match kind {
            "if_expression" | "while_expression" | "for_expression" | "loop_expression"
            | "match_arm" => true,
            "binary_expression" => has_operator(node, &["&&", "||"]),
            _ => false,
        },
        Language::Python => matches!(
            kind,
            "if_statement"
                | "elif_clause"
                | "for_statement"
                | "while_statement"
                | "except_clause"
                | "conditional_expression"
                | "boolean_operator"
        ),
        Language::TypeScript | Language::JavaScript => match kind {
            "if_statement" | "for_statement" | "for_in_statement" | "while_statement"
            | "do_statement" | "switch_case" | "catch_clause" | "ternary_expression" => true,
            "binary_expression" => has_operator(node, &["&&", "||"]),
            _ => false,
        },
        Language::Go => match kind {
            "if_statement" | "for_statement" | "expression_case" | "default_case" | "type_case"
            | "communication_case" => true,
            "binary_expression" => has_operator(node, &["&&", "||"]),
            _ => false,
        },
        Language::Java => match kind {
            "if_statement" | "for_statement" | "enhanced_for_statement" | "while_statement"
            | "do_statement" | "switch_label" | "catch_clause" | "ternary_expression" => true,
            "binary_expression" => has_operator(node, &["&&", "||"]),
            _ => false,
        },
        Language::C | Language::Cpp => match kind {
            "if_statement" | "for_statement" | "while_statement" | "do_statement"
            | "case_statement" | "conditional_expression" => true,
            "catch_clause" => language == Language::Cpp,
            "binary_expression" => has_operator(node, &["&&", "||"]),
            _ => false,
        },
        Language::Ruby => match kind {
            "if" | "elsif" | "unless" | "while" | "until" | "for" | "when" | "rescue"
            | "conditional" => true,
            "binary" => has_operator(node, &["&&", "||", "and", "or"]),
            _ => false,
        },
        Language::Php => matches!(
            kind,
            "if_statement"
                | "else_if_clause"
                | "for_statement"
                | "foreach_statement"
                | "while_statement"
                | "do_statement"
                | "case_statement"
                | "catch_clause"
                | "conditional_expression"
        ),
        Language::Kotlin => matches!(
            kind,
            "if_expression"
                | "when_entry"
                | "for_statement"
                | "while_statement"
                | "do_while_statement"
                | "catch_block"
                | "conjunction_expression"
                | "disjunction_expression"
        ),
        Language::Swift => matches!(
            kind,
            "if_statement"
                | "guard_statement"
                | "while_statement"
                | "repeat_while_statement"
                | "for_statement"
                | "switch_entry"
                | "catch_block"
                | "conjunction_expression"
                | "disjunction_expression"
                | "ternary_expression"
        ),
        Language::Unknown => false,
    }
}

/// Anonymous operator nodes carry their literal as the kind.
fn has_operator(node: &Node, operators: &[&str]) -> bool {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if operators.contains(&child.kind()) {
            return true;
        }
    }
    false
}

fn function_name(node: &Node, source: &[u8], language: Language) -> Option<String> {
    match language {
        Language::Rust | Language::Python | Language::Java | Language::Ruby => {
            find_child_text(node, "identifier", source)
        }
        Language::TypeScript | Language::JavaScript => match node.kind() {
            "method_definition" => find_child_text(node, "property_identifier", source),
            "arrow_function" | "function_expression" => assigned_name(node, source),
            _ => find_child_text(node, "identifier", source),
        },
        Language::Go => find_child_text(node, "identifier", source)
            .or_else(|| find_child_text(node, "field_identifier", source)),
        Language::C | Language::Cpp => find_declarator_name(node, source),
        Language::Php => find_child_text(node, "name", source),
        Language::Kotlin | Language::Swift => find_child_text(node, "simple_identifier", source),
        Language::Unknown => None,
    }
}

/// Name from an enclosing `const f = () => ...` style binding.
fn assigned_name(node: &Node, source: &[u8]) -> Option<String> {
    let parent = node.parent()?;
    if parent.kind() == "variable_declarator" || parent.kind() == "pair" {
        return find_child_text(&parent, "identifier", source)
            .or_else(|| find_child_text(&parent, "property_identifier", source));
    }
    None
}

fn find_declarator_name(node: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "function_declarator" {
            return find_child_text(&child, "identifier", source)
                .or_else(|| find_child_text(&child, "field_identifier", source));
        }
    }
    None
}

fn find_child_text(node: &Node, kind: &str, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            let text = node_text(&child, source);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn node_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    if start >= source.len() || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).to_string()
}
