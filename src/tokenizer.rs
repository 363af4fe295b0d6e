//! Tokenization: an external collaborator per spec.md's scope note — "text
//! normalization and tokenization (stemming, stop-word filtering, UTF-8/
//! Latin-1 repair, punctuation stripping)" is out of the core's scope, but
//! SPEC_FULL.md §2 (C12) still specifies its *contract* and ships a default
//! implementation satisfying it, since a crate that builds and queries an
//! index needs something behind the trait to run end to end.
//!
//! Grounded in `examples/original_source/src/normalizer/WordNormalizer.hpp`'s
//! contract (`normalize(str) -> TokenStream` yielding non-empty tokens, `""`
//! at end of stream) without its stemming/PCRE machinery, which SPEC_FULL.md
//! explicitly treats as swappable.

/// Produces a sequence of non-empty terms from a line of text. Implementors
/// decide case folding, punctuation handling, stemming and stop-word
/// removal; the only contract the rest of the crate relies on is "every
/// yielded term is non-empty UTF-8".
pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a>;
}

/// Default tokenizer: splits on non-alphanumeric boundaries and lowercases
/// (Unicode-aware via `char::to_lowercase`), dropping empty spans. No
/// stemming, no stop-word list — those are exactly the normalization
/// concerns spec.md names as out of scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTokenizer;

impl Tokenizer for DefaultTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(
            text.split(|c: char| !c.is_alphanumeric())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase()),
        )
    }
}

/// Term frequencies for one document: `(term, freq)` pairs, `freq >= 1`.
/// Iteration order is the tokenizer's insertion order into an internal
/// ahash map and is not meaningful; callers sort before writing to the
/// builder's per-term accumulator.
pub fn term_frequencies(tokenizer: &dyn Tokenizer, text: &str) -> ahash::AHashMap<String, u32> {
    let mut freqs: ahash::AHashMap<String, u32> = ahash::AHashMap::new();
    for term in tokenizer.tokenize(text) {
        *freqs.entry(term).or_insert(0) += 1;
    }
    freqs
}

/// Tokenize a query into a deduplicated, sorted set of terms — mirrors the
/// original's `std::set<std::string>` query representation
/// (`engine.cpp`: tokens are inserted into a `std::set`, which yields them
/// in sorted order with duplicates collapsed).
pub fn query_terms(tokenizer: &dyn Tokenizer, query: &str) -> Vec<String> {
    let set: std::collections::BTreeSet<String> = tokenizer.tokenize(query).collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        let t = DefaultTokenizer;
        let terms: Vec<String> = t.tokenize("Hello, World! Foo-bar.").collect();
        assert_eq!(terms, vec!["hello", "world", "foo", "bar"]);
    }

    #[test]
    fn empty_spans_are_dropped() {
        let t = DefaultTokenizer;
        let terms: Vec<String> = t.tokenize("  ,,,  ").collect();
        assert!(terms.is_empty());
    }

    #[test]
    fn term_frequencies_counts_repeats() {
        let t = DefaultTokenizer;
        let freqs = term_frequencies(&t, "the cat sat on the mat the cat ran");
        assert_eq!(freqs["the"], 3);
        assert_eq!(freqs["cat"], 2);
        assert_eq!(freqs["sat"], 1);
    }

    #[test]
    fn query_terms_dedup_and_sort() {
        let t = DefaultTokenizer;
        let terms = query_terms(&t, "banana apple banana cherry apple");
        assert_eq!(terms, vec!["apple", "banana", "cherry"]);
    }
}
