//! crates/chirp_core/src/extract.rs
//!
//! Pulls `#hashtags` and `@mentions` out of tweet text.
//!
//! Both scanners accept ASCII letters, digits and underscores after the sigil, the
//! same charset usernames are restricted to, and lower-case what they find.

use regex::Regex;
use std::sync::LazyLock;

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#([A-Za-z0-9_]+)").expect("hashtag pattern is valid")
});

static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z0-9_]+)").expect("mention pattern is valid")
});

/// Every hashtag occurrence in order, duplicates included.
pub fn hashtags(content: &str) -> Vec<String> {
    scan(&HASHTAG, content)
}

/// Every mention occurrence in order, duplicates included.
pub fn mentions(content: &str) -> Vec<String> {
    scan(&MENTION, content)
}

fn scan(pattern: &Regex, content: &str) -> Vec<String> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtags_are_lowercased_and_kept_in_order() {
        assert_eq!(hashtags("hello #Foo #foo @Bar"), vec!["foo", "foo"]);
    }

    #[test]
    fn mentions_are_lowercased() {
        assert_eq!(mentions("hey @Alice and @bob_2!"), vec!["alice", "bob_2"]);
    }

    #[test]
    fn bare_sigils_produce_nothing() {
        assert!(hashtags("# nothing here #").is_empty());
        assert!(mentions("mail me @ home").is_empty());
    }

    #[test]
    fn tokens_stop_at_punctuation() {
        assert_eq!(hashtags("#rust-lang, #async."), vec!["rust", "async"]);
    }

    #[test]
    fn non_ascii_letters_end_a_token() {
        assert_eq!(hashtags("#café"), vec!["caf"]);
        assert!(mentions("@ñandu").is_empty());
    }
}
