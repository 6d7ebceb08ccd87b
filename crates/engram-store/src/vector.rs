//! Bag-of-words vectorization and cosine similarity.
//!
//! This is a deliberate frequency model, not a learned embedding: it is
//! cheap, deterministic, and good enough to rank short conversational
//! observations against a query.
//!
//! # Tokenization
//!
//! Two kinds of tokens are recognised:
//!
//! * maximal runs of CJK ideographs (`U+4E00..=U+9FA5`) – consecutive
//!   ideographs form **one** token, they are not split per character;
//! * maximal runs of ASCII letters, lowercased.
//!
//! Everything else (digits, punctuation, whitespace, other scripts) is a
//! separator and contributes no tokens.
//!
//! # Example
//!
//! ```rust
//! use engram_store::vector::{vectorize, cosine_similarity};
//!
//! let a = vectorize("I like apples");
//! let b = vectorize("apples are a fruit");
//! let sim = cosine_similarity(&a, &b);
//! assert!(sim > 0.0 && sim < 1.0);
//! ```

use engram_types::TokenVector;

/// CJK unified ideograph range used by the tokenizer.
fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Turn `text` into a sparse token-frequency vector.
///
/// Pure and deterministic.  Tokens never appear with a count of zero;
/// text with no recognised tokens (including the empty string) yields an
/// empty vector.
pub fn vectorize(text: &str) -> TokenVector {
    let mut vector = TokenVector::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if is_cjk(c) {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if !is_cjk(c) {
                    break;
                }
                token.push(c);
                chars.next();
            }
            *vector.entry(token).or_insert(0) += 1;
        } else if c.is_ascii_alphabetic() {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if !c.is_ascii_alphabetic() {
                    break;
                }
                token.push(c.to_ascii_lowercase());
                chars.next();
            }
            *vector.entry(token).or_insert(0) += 1;
        } else {
            chars.next();
        }
    }

    vector
}

/// Cosine similarity between two token-frequency vectors.
///
/// Frequencies are non-negative, so the result is in `[0.0, 1.0]`.
/// Returns `0.0` if either vector is empty (zero norm) – never an error,
/// never NaN.  Symmetric in its arguments.
pub fn cosine_similarity(a: &TokenVector, b: &TokenVector) -> f32 {
    // Keys only present in one vector contribute nothing to the dot
    // product, so iterating the smaller map covers the whole union.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f32 = small
        .iter()
        .filter_map(|(token, &va)| large.get(token).map(|&vb| va as f32 * vb as f32))
        .sum();

    let norm_a: f32 = a.values().map(|&v| (v as f32) * (v as f32)).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|&v| (v as f32) * (v as f32)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── vectorize ────────────────────────────────────────────────────────────

    #[test]
    fn empty_text_yields_empty_vector() {
        assert!(vectorize("").is_empty());
    }

    #[test]
    fn separators_only_yield_empty_vector() {
        assert!(vectorize("123 ... !?! 456").is_empty());
    }

    #[test]
    fn counts_repeated_tokens() {
        let v = vectorize("apple apple banana");
        assert_eq!(v.get("apple"), Some(&2));
        assert_eq!(v.get("banana"), Some(&1));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn ascii_tokens_are_lowercased() {
        let v = vectorize("Apple APPLE aPpLe");
        assert_eq!(v.get("apple"), Some(&3));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn no_zero_count_entries() {
        let v = vectorize("one two three");
        assert!(v.values().all(|&count| count > 0));
    }

    #[test]
    fn cjk_run_forms_single_token() {
        let v = vectorize("你好世界");
        assert_eq!(v.get("你好世界"), Some(&1));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn punctuation_splits_cjk_runs() {
        let v = vectorize("你好，世界");
        assert_eq!(v.get("你好"), Some(&1));
        assert_eq!(v.get("世界"), Some(&1));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn script_boundary_splits_tokens_without_separator() {
        let v = vectorize("hello你好world");
        assert_eq!(v.get("hello"), Some(&1));
        assert_eq!(v.get("你好"), Some(&1));
        assert_eq!(v.get("world"), Some(&1));
    }

    #[test]
    fn digits_and_underscores_separate_ascii_runs() {
        let v = vectorize("foo42bar_baz");
        assert_eq!(v.get("foo"), Some(&1));
        assert_eq!(v.get("bar"), Some(&1));
        assert_eq!(v.get("baz"), Some(&1));
        assert!(!v.contains_key("foo42bar"));
    }

    // ── cosine_similarity ────────────────────────────────────────────────────

    #[test]
    fn identical_vectors_score_one() {
        let v = vectorize("apples and oranges and pears");
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_vector_scores_zero() {
        let v = vectorize("apples");
        let empty = TokenVector::new();
        assert_eq!(cosine_similarity(&v, &empty), 0.0);
        assert_eq!(cosine_similarity(&empty, &v), 0.0);
        assert_eq!(cosine_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn disjoint_vectors_score_zero() {
        let a = vectorize("apples");
        let b = vectorize("oranges");
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = vectorize("the cat sat on the mat");
        let b = vectorize("the dog sat");
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn similarity_stays_in_unit_interval() {
        let pairs = [
            ("apples apples apples", "apples"),
            ("a b c d", "c d e f"),
            ("你好 世界", "你好"),
            ("overlap free", "disjoint tokens"),
        ];
        for (x, y) in pairs {
            let sim = cosine_similarity(&vectorize(x), &vectorize(y));
            assert!((0.0..=1.0 + 1e-6).contains(&sim), "sim({x:?}, {y:?}) = {sim}");
        }
    }

    #[test]
    fn partial_overlap_scores_between_zero_and_one() {
        // query {apples} vs {apples, are, a, fruit}: dot = 1, norms 1 and 2.
        let q = vectorize("apples");
        let r = vectorize("apples are a fruit");
        let sim = cosine_similarity(&q, &r);
        assert!((sim - 0.5).abs() < 1e-6);
    }
}
