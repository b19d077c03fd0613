//! Character classification predicates over Unicode scalar values, per XML 1.0
//! Fifth Edition Appendix B. Every predicate here operates on a `char` (a
//! Unicode scalar value); callers never see surrogate halves.

/// `S ::= (#x20 | #x9 | #xD | #xA)+`
#[inline]
pub fn is_whitespace(c: char) -> bool {
    matches!(c, '\u{20}' | '\u{9}' | '\u{D}' | '\u{A}')
}

/// `Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
#[inline]
pub fn is_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}

/// `NameStartChar` per XML 1.0 Fifth Edition Appendix B.
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':'
        | 'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}'
    )
}

/// `NameChar ::= NameStartChar | "-" | "." | [0-9] | #xB7 | [#x0300-#x036F] | [#x203F-#x2040]`
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9'
            | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}'
        )
}

/// `NCNameStartChar ::= NameStartChar - ':'`, used for namespace prefixes/local names.
#[inline]
pub fn is_ncname_start_char(c: char) -> bool {
    c != ':' && is_name_start_char(c)
}

/// `NCNameChar ::= NameChar - ':'`, used for namespace prefixes/local names.
#[inline]
pub fn is_ncname_char(c: char) -> bool {
    c != ':' && is_name_char(c)
}

/// A string is an `NCName` if every character satisfies [`is_ncname_char`] and
/// the first satisfies [`is_ncname_start_char`].
pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ncname_start_char(c) => chars.all(is_ncname_char),
        _ => false,
    }
}

/// `PubidChar ::= #x20 | #xD | #xA | [a-zA-Z0-9] | [-'()+,./:=?;!*#@$_%]`
#[inline]
pub fn is_pubid_char(c: char) -> bool {
    matches!(c,
        '\u{20}' | '\u{D}' | '\u{A}'
        | 'a'..='z' | 'A'..='Z' | '0'..='9'
        | '-' | '\'' | '(' | ')' | '+' | ',' | '.' | '/' | ':' | '='
        | '?' | ';' | '!' | '*' | '#' | '@' | '$' | '_' | '%'
    )
}
