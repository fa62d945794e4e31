//! Glob matching with the semantics of the Redis `KEYS` command.
//!
//! Supports:
//!     * - any sequence of characters (including empty)
//!     ? - any single character
//!     [abc] - any character in the set
//!     [a-z] - any character in the range
//!     [^...] - negated set
//!     \x - literal x

/// Returns true if `text` matches the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    match_bytes(pattern.as_bytes(), text.as_bytes())
}

/// Byte-level variant for keys that are not valid UTF-8.
pub fn glob_match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match_bytes(pattern, text)
}

fn match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    let mut p = 0;
    let mut t = 0;

    while p < pattern.len() {
        match pattern[p] {
            b'*' => {
                while p + 1 < pattern.len() && pattern[p + 1] == b'*' {
                    p += 1;
                }
                p += 1;
                if p == pattern.len() {
                    return true;
                }
                return (t..=text.len()).any(|start| match_bytes(&pattern[p..], &text[start..]));
            }
            b'?' => {
                if t == text.len() {
                    return false;
                }
                p += 1;
                t += 1;
            }
            b'[' => {
                if t == text.len() {
                    return false;
                }
                let c = text[t];
                p += 1;

                let negate = p < pattern.len() && pattern[p] == b'^';
                if negate {
                    p += 1;
                }

                let mut matched = false;
                while p < pattern.len() && pattern[p] != b']' {
                    if pattern[p] == b'\\' && p + 1 < pattern.len() {
                        matched |= pattern[p + 1] == c;
                        p += 2;
                    } else if p + 2 < pattern.len()
                        && pattern[p + 1] == b'-'
                        && pattern[p + 2] != b']'
                    {
                        let (lo, hi) = if pattern[p] <= pattern[p + 2] {
                            (pattern[p], pattern[p + 2])
                        } else {
                            (pattern[p + 2], pattern[p])
                        };
                        matched |= lo <= c && c <= hi;
                        p += 3;
                    } else {
                        matched |= pattern[p] == c;
                        p += 1;
                    }
                }
                // unterminated class: treat as if closed
                if p < pattern.len() {
                    p += 1;
                }

                if matched == negate {
                    return false;
                }
                t += 1;
            }
            b'\\' if p + 1 < pattern.len() => {
                if t == text.len() || pattern[p + 1] != text[t] {
                    return false;
                }
                p += 2;
                t += 1;
            }
            literal => {
                if t == text.len() || literal != text[t] {
                    return false;
                }
                p += 1;
                t += 1;
            }
        }
    }

    t == text.len()
}
