// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Glob matching for key scans.

/// Returns `true` if `key` matches the scan `pattern`.
///
/// Follows Redis glob syntax: `*` matches any run of characters, `?` matches exactly one
/// character, `[...]` matches one character from a class (`[^...]` negates it, `a-z` is a
/// range) and `\` escapes the next character.
///
/// # Examples
///
/// ```
/// use bucketeer_cache_tier::pattern::matches;
///
/// assert!(matches("env-1:segment_users:*", "env-1:segment_users:seg-1"));
/// assert!(!matches("env-1:segment_users:*", "env-2:segment_users:seg-1"));
/// assert!(matches("env-[12]:*", "env-2:features"));
/// ```
#[must_use]
pub fn matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position after the last `*` and the key position it is currently absorbing.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        if pattern.get(p) == Some(&'*') {
            backtrack = Some((p + 1, k));
            p += 1;
            continue;
        }

        match step(&pattern, p, key[k]) {
            Some(next) => {
                p = next;
                k += 1;
            }
            None => match backtrack {
                Some((star_p, star_k)) => {
                    p = star_p;
                    k = star_k + 1;
                    backtrack = Some((star_p, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Escapes `literal` so that it only matches itself when used in a pattern.
///
/// Use it for every caller-supplied part of a scan prefix, so that an identifier such as
/// `env?` cannot match keys of other identifiers.
///
/// # Examples
///
/// ```
/// use bucketeer_cache_tier::pattern::{escape, matches};
///
/// let pattern = format!("{}:*", escape("env?"));
/// assert!(matches(&pattern, "env?:segment_users:seg-1"));
/// assert!(!matches(&pattern, "envX:segment_users:seg-1"));
/// ```
#[must_use]
pub fn escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Matches `c` against the single-character element at `p`, returning the position after it.
fn step(pattern: &[char], p: usize, c: char) -> Option<usize> {
    match *pattern.get(p)? {
        '?' => Some(p + 1),
        '[' => class(pattern, p + 1, c),
        '\\' if p + 1 < pattern.len() => (pattern[p + 1] == c).then_some(p + 2),
        literal => (literal == c).then_some(p + 1),
    }
}

fn class(pattern: &[char], mut p: usize, c: char) -> Option<usize> {
    let negated = pattern.get(p) == Some(&'^');
    if negated {
        p += 1;
    }

    let mut found = false;
    loop {
        match pattern.get(p) {
            // An unterminated class runs to the end of the pattern.
            None => break,
            Some(']') => {
                p += 1;
                break;
            }
            Some('\\') if p + 1 < pattern.len() => {
                found |= pattern[p + 1] == c;
                p += 2;
            }
            Some(&start) if pattern.get(p + 1) == Some(&'-') && p + 2 < pattern.len() => {
                let end = pattern[p + 2];
                let (low, high) = if start <= end { (start, end) } else { (end, start) };
                found |= (low..=high).contains(&c);
                p += 3;
            }
            Some(&literal) => {
                found |= literal == c;
                p += 1;
            }
        }
    }

    (found != negated).then_some(p)
}
