//! Name normalization for modules, controllers and actions.

/// Separator that marks a snake_case token
const WORD_SEPARATOR: char = '_';

/// `blog_post` -> `BlogPost`
pub fn camelize(s: &str) -> String {
    s.split(WORD_SEPARATOR).map(ucfirst).collect()
}

/// `BlogPost` -> `blog_post`
pub fn underscore(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push(WORD_SEPARATOR);
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Module and controller tokens: camelized when snake_case, else capitalized
pub fn normalize_controller(token: &str) -> String {
    if token.contains(WORD_SEPARATOR) {
        camelize(token)
    } else {
        ucfirst(token)
    }
}

/// Action tokens: lower camel case when snake_case, else left as is
pub fn normalize_action(token: &str) -> String {
    if token.contains(WORD_SEPARATOR) {
        lcfirst(&camelize(token))
    } else {
        token.to_string()
    }
}
