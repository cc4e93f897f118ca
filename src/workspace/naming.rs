//! Identifier rules for workspace names.
//!
//! Workspace keys double as variable names in expressions, so they follow the
//! expression language's identifier rule: ASCII letters, digits and `_`, at
//! least one letter, no digit before the first letter, and not a keyword or
//! reserved symbol.

/// Keywords and reserved symbols of the expression language
pub const RESERVED_WORDS: &[&str] = &[
    // keywords
    "true", "false", "let", "const", "if", "else", "switch", "do", "while", "until", "loop",
    "for", "in", "continue", "break", "return", "throw", "try", "catch", "import", "export",
    "as", "global", "private", "fn", "Fn", "call", "curry", "this", "type_of", "print",
    "debug", "eval", "is_def_var", "is_def_fn", "is_shared",
    // reserved for future use
    "var", "static", "shared", "goto", "exit", "match", "case", "public", "protected", "super",
    "new", "use", "module", "package", "sync", "async", "await", "yield", "spawn", "thread",
    "go", "with", "is", "default", "void", "null", "nil",
];

/// Appended to a name that collides with a reserved word
pub const RESERVED_SUFFIX: &str = "2";

/// Whether `name` is a keyword or reserved symbol
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Map an arbitrary string onto the identifier rule.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, as do digits that appear
/// before the first letter. A reserved word gets [`RESERVED_SUFFIX`].
/// Returns an empty string when the input contains no ASCII letter.
pub fn sanitize(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len());
    let mut seen_letter = false;
    for ch in candidate.chars() {
        if ch.is_ascii_alphabetic() {
            seen_letter = true;
            out.push(ch);
        } else if ch.is_ascii_digit() && seen_letter {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    if !seen_letter {
        return String::new();
    }
    if is_reserved(&out) {
        out.push_str(RESERVED_SUFFIX);
    }
    out
}

/// Whether `name` can be used verbatim as a workspace key
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && sanitize(name) == name
}

/// The `n`-th name of the sequence `a, b, …, z, aa, ab, …`
pub fn nth_generated_name(n: usize) -> String {
    let mut n = n + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Smallest generated name that is neither reserved nor taken.
///
/// `taken_count` bounds how many names `taken` can reject, which bounds the
/// search.
pub fn first_free_generated(taken: impl Fn(&str) -> bool, taken_count: usize) -> String {
    let limit = taken_count + RESERVED_WORDS.len() + 1;
    (0..limit)
        .map(nth_generated_name)
        .find(|name| !is_reserved(name) && !taken(name))
        .unwrap_or_else(|| nth_generated_name(limit))
}

/// Sanitize `candidate` and make it distinct from every taken name by
/// appending the smallest free `_1`, `_2`, … suffix.
pub fn unique_name(candidate: &str, taken: impl Fn(&str) -> bool, taken_count: usize) -> String {
    let base = sanitize(candidate);
    if base.is_empty() {
        return first_free_generated(taken, taken_count);
    }
    if !taken(&base) {
        return base;
    }

    // At most `taken_count` of these `taken_count + 1` candidates are in use
    (1..=taken_count + 1)
        .map(|n| format!("{base}_{n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| format!("{base}_{}", taken_count + 1))
}
