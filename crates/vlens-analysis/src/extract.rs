//! Locate the JSON object embedded in free-form model text.
//!
//! Models often wrap the requested object in prose or Markdown fences.
//! The scan starts at a `{` and follows brace depth, skipping braces that
//! appear inside string literals, until the object closes.

/// Return the first brace-balanced `{...}` span of `text`.
///
/// A `{` that never closes (a stray brace in prose, say) is passed over and
/// the scan restarts at the next one. Returns `None` when no `{` closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        if let Some(len) = balanced_len(&text[start..]) {
            return Some(&text[start..start + len]);
        }
        from = start + 1;
    }
    None
}

/// Byte length of the balanced object at the start of `text`, which must
/// begin with `{`.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
