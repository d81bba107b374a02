//! Description normalization
//!
//! Turns a raw bank description into the key that patterns are learned and
//! matched on. Merchant-name tokens survive (including embedded punctuation
//! such as `NETFLIX.COM` or `7-ELEVEN`); tokens that only identify a single
//! transaction (store numbers, authorization codes, reference ids) are dropped.

/// Characters that separate tokens in addition to whitespace.
/// Card processors glue ids onto merchant names with these (`NETFLIX.COM*12345`).
const SEPARATORS: &[char] = &['*', '#'];

/// Payment-rail prefixes that precede the merchant name
const RAIL_PREFIXES: &[&str] = &["APLPAY", "APPLEPAY", "SQ", "TST", "SP", "POS", "PP"];

/// Normalize a raw description into a matching key
///
/// Uppercases, splits on whitespace and processor separators, trims
/// punctuation from token edges, drops noise tokens and rejoins with single
/// spaces. Returns an empty string when nothing meaningful remains.
pub fn normalize(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let spaced = upper.replace(SEPARATORS, " ");

    let mut tokens: Vec<&str> = spaced
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty() && !is_noise_token(t))
        .collect();

    // Leading rail prefixes go, but never the last remaining token
    while tokens.len() > 1 && RAIL_PREFIXES.contains(&tokens[0]) {
        tokens.remove(0);
    }

    tokens.join(" ")
}

/// Split normalized text into its tokens
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}

/// A token that carries no merchant information
///
/// Either it has no letters at all (`12345`, `06/14`, `$15.49`), or it is a
/// digit-heavy code (`T-1234`, `839201AB`).
fn is_noise_token(token: &str) -> bool {
    let len = token.chars().count();
    let letters = token.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return true;
    }

    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    len >= 6 && digits * 2 >= len
}
