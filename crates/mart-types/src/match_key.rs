//! Resolves spec §9's open question: whether `"A+B"` and `"B+A"` are the
//! same match-key for filtering purposes.
//!
//! This implementation fixes the policy as **token-sort equality**: a
//! match-key is split on `+`, its tokens are sorted, and two match-keys are
//! considered equivalent for filter matching iff their sorted token lists
//! are equal. See `DESIGN.md` for why this policy was chosen over an
//! endpoint-side lookup table.

use std::collections::BTreeSet;

/// Splits `match_key` on `+` and returns the sorted, deduplicated token set
/// used to compare two match-keys for filter-matching equality.
#[must_use]
pub fn normalize_match_key_tokens(match_key: &str) -> BTreeSet<&str> {
    match_key.split('+').map(str::trim).filter(|t| !t.is_empty()).collect()
}

/// Computes the canonical reversed form of `match_key`: its tokens,
/// sorted, rejoined with `+`. Two match-keys that reverse to the same
/// string are the same relationship for query-filter purposes.
#[must_use]
pub fn reverse_match_key(match_key: &str) -> String {
    normalize_match_key_tokens(match_key).into_iter().collect::<Vec<_>>().join("+")
}

/// Whether `a` and `b` address the same relationship under the token-sort
/// policy, e.g. `"ADDRESS+PHONE_NUMBER"` and `"PHONE_NUMBER+ADDRESS"`.
#[must_use]
pub fn match_keys_equivalent(a: &str, b: &str) -> bool {
    normalize_match_key_tokens(a) == normalize_match_key_tokens(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_compound_key_is_equivalent() {
        assert!(match_keys_equivalent("ADDRESS+PHONE_NUMBER", "PHONE_NUMBER+ADDRESS"));
    }

    #[test]
    fn different_keys_are_not_equivalent() {
        assert!(!match_keys_equivalent("NAME+DOB", "NAME+ADDRESS"));
    }

    #[test]
    fn single_token_key_reverses_to_itself() {
        assert_eq!(reverse_match_key("PHONE"), "PHONE");
    }

    #[test]
    fn canonical_form_is_sorted_token_join() {
        assert_eq!(reverse_match_key("PHONE_NUMBER+ADDRESS"), "ADDRESS+PHONE_NUMBER");
    }
}
