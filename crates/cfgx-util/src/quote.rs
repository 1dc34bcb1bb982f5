use std::fmt::Write;

/// Quote `input` as a string literal, preferring `preferred` as the delimiter.
///
/// The other quote character is used instead when the input contains the preferred one but
/// not the other, which is how Python's `repr()` picks its quotes.
///
/// # Example
///
/// ```
/// use cfgx_util::quote::quote;
/// assert_eq!(quote("abc", '\''), "'abc'");
/// assert_eq!(quote("it's", '\''), "\"it's\"");
/// assert_eq!(quote("a\nb", '"'), "\"a\\nb\"");
/// ```
pub fn quote(input: &str, preferred: char) -> String {
    let other = if preferred == '"' { '\'' } else { '"' };
    let delimiter = if input.contains(preferred) && !input.contains(other) {
        other
    } else {
        preferred
    };

    let mut ret = String::with_capacity(input.len() + 2);
    ret.push(delimiter);
    for c in input.chars() {
        match c {
            '\\' => ret.push_str("\\\\"),
            '\n' => ret.push_str("\\n"),
            '\r' => ret.push_str("\\r"),
            '\t' => ret.push_str("\\t"),
            c if c == delimiter => {
                ret.push('\\');
                ret.push(c);
            }
            c if c.is_control() => {
                let _ = write!(ret, "\\x{:02x}", c as u32);
            }
            c => ret.push(c),
        }
    }
    ret.push(delimiter);
    ret
}

/// Undo [`quote`]: strip the surrounding quotes from a string literal and process its escapes.
///
/// Unknown escapes keep their backslash, like Python does. Returns `None` if the literal is
/// not delimited by matching quotes or contains a malformed numeric escape.
pub fn unquote(literal: &str) -> Option<String> {
    let mut chars = literal.chars();
    let open = chars.next()?;
    let close = chars.next_back()?;
    if !matches!(open, '\'' | '"') || open != close {
        return None;
    }

    let body = chars.as_str();
    let mut ret = String::with_capacity(body.len());
    let mut iter = body.chars();
    while let Some(c) = iter.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }

        match iter.next()? {
            // Escaped newline continues the literal on the next line
            '\n' => {}
            '\\' => ret.push('\\'),
            '\'' => ret.push('\''),
            '"' => ret.push('"'),
            'n' => ret.push('\n'),
            'r' => ret.push('\r'),
            't' => ret.push('\t'),
            '0' => ret.push('\0'),
            'a' => ret.push('\x07'),
            'b' => ret.push('\x08'),
            'f' => ret.push('\x0c'),
            'v' => ret.push('\x0b'),
            'x' => ret.push(hex_escape(&mut iter, 2)?),
            'u' => ret.push(hex_escape(&mut iter, 4)?),
            'U' => ret.push(hex_escape(&mut iter, 8)?),
            other => {
                ret.push('\\');
                ret.push(other);
            }
        }
    }

    Some(ret)
}

fn hex_escape(iter: &mut std::str::Chars, width: usize) -> Option<char> {
    let digits: String = iter.by_ref().take(width).collect();
    if digits.len() != width {
        return None;
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
}
