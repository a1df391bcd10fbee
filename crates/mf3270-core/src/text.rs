//! Text encoding between callers and the scripting protocol.
//!
//! Outgoing text ends up inside a quoted `String("...")` action, so
//! backslashes and double quotes have to be escaped. Incoming screen text
//! from `ascii(...)` carries backslash escapes that are decoded back into
//! characters.

/// Escape text for use inside a quoted protocol string.
pub fn quote(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Decode backslash escapes in screen text returned by the emulator.
///
/// Recognized sequences:
/// - `\n`, `\r`, `\t`, `\a`, `\b`, `\f`, `\v`, `\0`
/// - `\\`, `\"`, `\'`
/// - `\xNN`, `\uNNNN`, `\UNNNNNNNN` (hex code points)
///
/// Anything else, including malformed hex escapes, is kept literally.
pub fn unescape(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        let simple = match chars.peek() {
            Some('n') => Some('\n'),
            Some('r') => Some('\r'),
            Some('t') => Some('\t'),
            Some('a') => Some('\x07'),
            Some('b') => Some('\x08'),
            Some('f') => Some('\x0c'),
            Some('v') => Some('\x0b'),
            Some('0') => Some('\0'),
            Some('\\') => Some('\\'),
            Some('"') => Some('"'),
            Some('\'') => Some('\''),
            _ => None,
        };
        if let Some(decoded) = simple {
            chars.next();
            result.push(decoded);
            continue;
        }

        let width = match chars.peek() {
            Some('x') => 2,
            Some('u') => 4,
            Some('U') => 8,
            _ => {
                // Not a recognized escape, keep the backslash
                result.push('\\');
                continue;
            }
        };
        let marker = chars.next().unwrap_or_default();
        let hex: String = chars.by_ref().take(width).collect();
        let decoded = (hex.len() == width)
            .then(|| u32::from_str_radix(&hex, 16).ok())
            .flatten()
            .and_then(char::from_u32);
        match decoded {
            Some(ch) => result.push(ch),
            None => {
                // Invalid hex escape, output as-is
                result.push('\\');
                result.push(marker);
                result.push_str(&hex);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("hello"), "hello");
    }

    #[test]
    fn test_quote_double_quotes() {
        assert_eq!(quote(r#"say "hi""#), r#"say \"hi\""#);
    }

    #[test]
    fn test_quote_backslashes() {
        assert_eq!(quote(r"C:\temp"), r"C:\\temp");
        assert_eq!(quote("trailing\\"), "trailing\\\\");
        assert_eq!(quote(r#"\""#), r#"\\\""#);
    }

    #[test]
    fn test_unescape_plain() {
        assert_eq!(unescape(b"LOGON APPLID"), "LOGON APPLID");
    }

    #[test]
    fn test_unescape_spaces_preserved() {
        assert_eq!(unescape(b"  padded  "), "  padded  ");
    }

    #[test]
    fn test_unescape_control_escapes() {
        assert_eq!(unescape(br"a\nb\tc\rd"), "a\nb\tc\rd");
    }

    #[test]
    fn test_unescape_backslash_and_quotes() {
        assert_eq!(unescape(br#"C:\\dir \"x\" \'y\'"#), r#"C:\dir "x" 'y'"#);
    }

    #[test]
    fn test_unescape_hex() {
        assert_eq!(unescape(br"\x41\x42"), "AB");
        assert_eq!(unescape(br"\u00e9t\u00e9"), "été");
        assert_eq!(unescape(br"\U0001F600"), "\u{1F600}");
    }

    #[test]
    fn test_unescape_invalid_hex_kept() {
        assert_eq!(unescape(br"\xZZ"), r"\xZZ");
        assert_eq!(unescape(br"\x4"), r"\x4");
    }

    #[test]
    fn test_unescape_unknown_escape_kept() {
        assert_eq!(unescape(br"\q"), r"\q");
        assert_eq!(unescape(b"trailing\\"), "trailing\\");
    }

    #[test]
    fn test_unescape_utf8_passthrough() {
        assert_eq!(unescape("größe".as_bytes()), "größe");
    }
}
