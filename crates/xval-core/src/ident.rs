//! Identifier rules for names exposed to rule expressions.

/// Words the expression language reserves. None of these may be declared
/// as a variable.
const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "else", "false", "for", "function", "if", "import", "in",
    "let", "loop", "namespace", "null", "package", "return", "true", "var", "void", "while",
];

/// Returns true if `name` can be declared as a top-level variable:
/// `[A-Za-z_][A-Za-z0-9_]*` and not a reserved word.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !RESERVED.contains(&name)
}
