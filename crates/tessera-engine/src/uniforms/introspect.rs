//! Uniform block member discovery from shader source text.
//!
//! No shader compiler is involved: the scan looks for a single uniform declaration
//! (`var<uniform>` in WGSL, `uniform Name { ... }` in GLSL), locates the block body and
//! lists the member names in source order. Anything malformed yields `None`.

/// Discovers the packed members of a shader's uniform block.
pub trait UniformReflection {
    /// Member names of the uniform block declared in `source`, in declaration order.
    fn uniform_names(&self, source: &str) -> Option<Vec<String>>;

    /// Combines several stages: the longest non-empty list wins, the first on ties.
    /// A stage whose names are not a subset of the winner is reported.
    fn uniform_names_of(&self, sources: &[&str]) -> Option<Vec<String>> {
        let found: Vec<Vec<String>> = sources
            .iter()
            .filter_map(|s| self.uniform_names(s))
            .filter(|names| !names.is_empty())
            .collect();

        let best = found
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
            .map(|(_, names)| names.clone())?;

        for other in &found {
            if !other.iter().all(|n| best.contains(n)) {
                log::warn!(
                    "uniform blocks disagree across stages: keeping {:?}, ignoring {:?}",
                    best,
                    other
                );
            }
        }
        Some(best)
    }
}

/// Text-scanning [`UniformReflection`] for WGSL and GLSL.
#[derive(Debug, Default, Copy, Clone)]
pub struct TextualReflection;

impl UniformReflection for TextualReflection {
    fn uniform_names(&self, source: &str) -> Option<Vec<String>> {
        let src = strip_comments(source);
        if src.contains("var<uniform>") {
            wgsl_block(&src)
        } else {
            glsl_block(&src)
        }
    }
}

/// Blanks out `//` and `/* */` comments, keeping line structure.
pub(crate) fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

/// Identifiers in `body` whose next non-space character satisfies `follows`.
fn identifiers_followed_by(body: &str, follows: impl Fn(char) -> bool) -> Vec<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut names = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_ident_start(c) && (i == 0 || !is_ident_char(chars[i - 1]) && chars[i - 1] != '@') {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let next = chars[i..].iter().copied().find(|c| !c.is_whitespace());
            if next.is_some_and(&follows) {
                names.push(chars[start..i].iter().collect());
            }
        } else {
            i += 1;
        }
    }
    names
}

/// Text between the `{` at `open` and its matching `}`.
fn braced_body(src: &str, open: usize) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in src[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&src[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds `keyword <name> {` and returns the offset of the brace.
fn find_named_block(src: &str, keyword: &str, name: Option<&str>) -> Option<(String, usize)> {
    let mut from = 0;
    while let Some(rel) = src[from..].find(keyword) {
        let at = from + rel;
        from = at + keyword.len();

        let boundary_before = src[..at].chars().next_back().is_none_or(|c| !is_ident_char(c));
        let rest = &src[from..];
        if !boundary_before || !rest.starts_with(char::is_whitespace) {
            continue;
        }

        let rest_trim = rest.trim_start();
        let ident_len = rest_trim
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest_trim.len());
        let ident = &rest_trim[..ident_len];
        if !is_identifier(ident) || name.is_some_and(|n| n != ident) {
            continue;
        }

        let after = &rest_trim[ident_len..];
        if after.trim_start().starts_with('{') {
            let brace = src.len() - after.trim_start().len();
            return Some((ident.to_owned(), brace));
        }
    }
    None
}

fn wgsl_block(src: &str) -> Option<Vec<String>> {
    let decl_start = src.find("var<uniform>")? + "var<uniform>".len();
    let decl_end = decl_start + src[decl_start..].find(';')?;
    let decl = &src[decl_start..decl_end];

    let (_, ty) = decl.rsplit_once(':')?;
    let ty = ty.trim();
    if !is_identifier(ty) {
        return None;
    }

    let (_, brace) = find_named_block(src, "struct", Some(ty))?;
    let body = braced_body(src, brace)?;
    Some(identifiers_followed_by(body, |c| c == ':'))
}

fn glsl_block(src: &str) -> Option<Vec<String>> {
    let (_, brace) = find_named_block(src, "uniform", None)?;
    let body = braced_body(src, brace)?;
    Some(identifiers_followed_by(body, |c| c == ';' || c == '['))
}
