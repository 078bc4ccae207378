//! Numeric input parsing
//!
//! Only the first whitespace-delimited token counts; the rest of the line
//! is ignored. The token must be a whole integer, `"1x"` is not `1`.

/// First whitespace-delimited token, if any.
pub fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Menu choice: signed decimal, optional `+`/`-`.
///
/// The whole token must parse. This is stricter than `scanf("%d")`-style
/// prefix parsing on purpose: `1x` is an illegal choice, not command 1.
pub fn parse_choice(line: &str) -> Option<i32> {
    first_token(line)?.parse().ok()
}

/// Duty value: unsigned decimal.
///
/// Not range checked against 16 bits; `70000` comes back as `70000`.
pub fn parse_duty(line: &str) -> Option<u32> {
    first_token(line)?.parse().ok()
}
