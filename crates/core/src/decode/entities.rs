//! HTML character reference decoding.
//!
//! Handles numeric references (`&#60;`, `&#x3C;`) and the named references
//! that appear in escaped article bodies. Unknown names and malformed
//! references are left untouched, as browsers do.

/// Named references recognised by [`decode_entities`].
const NAMED: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{a0}"),
    ("ensp", "\u{2002}"),
    ("emsp", "\u{2003}"),
    ("thinsp", "\u{2009}"),
    ("zwj", "\u{200d}"),
    ("zwnj", "\u{200c}"),
    ("shy", "\u{ad}"),
    ("copy", "©"),
    ("reg", "®"),
    ("trade", "™"),
    ("hellip", "…"),
    ("mdash", "—"),
    ("ndash", "–"),
    ("lsquo", "‘"),
    ("rsquo", "’"),
    ("ldquo", "“"),
    ("rdquo", "”"),
    ("laquo", "«"),
    ("raquo", "»"),
    ("middot", "·"),
    ("bull", "•"),
    ("deg", "°"),
    ("times", "×"),
    ("divide", "÷"),
    ("plusmn", "±"),
    ("para", "¶"),
    ("sect", "§"),
    ("yen", "¥"),
    ("euro", "€"),
    ("pound", "£"),
    ("cent", "¢"),
    ("larr", "←"),
    ("rarr", "→"),
    ("uarr", "↑"),
    ("darr", "↓"),
];

/// Longest name in [`NAMED`], bounding the lookahead.
const MAX_NAME_LEN: usize = 8;

/// Decodes HTML character references in `input`.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match decode_reference(candidate) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decodes one reference at the start of `s` (which begins with `&`).
///
/// Returns the replacement and the number of bytes consumed.
fn decode_reference(s: &str) -> Option<(String, usize)> {
    let body = &s[1..];
    if let Some(numeric) = body.strip_prefix('#') {
        let (digits, radix, prefix_len) = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (numeric, 10, 1),
        };
        let len = digits.chars().take_while(|c| c.is_digit(radix)).count();
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).ok()?;
        let ch = char::from_u32(code).filter(|c| *c != '\0').unwrap_or('\u{fffd}');
        let mut consumed = 1 + prefix_len + len;
        if digits[len..].starts_with(';') {
            consumed += 1;
        }
        return Some((ch.to_string(), consumed));
    }

    let len = body.chars().take(MAX_NAME_LEN + 1).take_while(|c| c.is_ascii_alphanumeric()).count();
    if len == 0 || !body[len..].starts_with(';') {
        return None;
    }
    let name = &body[..len];
    NAMED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| (value.to_string(), 1 + len + 1))
}

/// Escapes the characters [`decode_entities`] reverses for `&`, `<`, `>`, `"` and `'`.
pub fn encode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
