//! Query normalization for noisy invoice text.
//!
//! Every product description is folded into two variants:
//! - **lexical**: ASCII-folded, punctuation stripped, lowercase, single-spaced.
//!   Sent to the search engine as the text query.
//! - **embedding**: the lexical variant with short noise tokens removed
//!   (pack sizes, country codes), fed to the embedding model.
//!
//! Both functions are pure and total: any input, including the empty string,
//! yields a (possibly empty) string.

use unicode_normalization::UnicodeNormalization;

use crate::structs::catalog_config::NormalizerRules;

/// Both normalized forms of a single product description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub lexical: String,
    pub embedding_text: String,
}

impl NormalizedQuery {
    /// Normalize `raw` in both modes with the same rules.
    pub fn from_raw(raw: &str, rules: &NormalizerRules) -> Self {
        Self {
            lexical: normalize(raw, false, rules),
            embedding_text: normalize(raw, true, rules),
        }
    }

    /// First lexical token; used as the infix filter on the catalog name.
    pub fn dominant_token(&self) -> Option<&str> {
        self.lexical.split(' ').next().filter(|t| !t.is_empty())
    }

    /// Text to embed: the embedding variant, or the lexical one when filtering left nothing.
    pub fn embedding_input(&self) -> &str {
        if self.embedding_text.is_empty() {
            &self.lexical
        } else {
            &self.embedding_text
        }
    }
}

/// Normalize a raw description.
///
/// Steps, in order:
/// 1. decompose (NFKD) and drop everything that is not ASCII, so `mắt` becomes `mat`;
/// 2. replace every non-alphanumeric character with a space;
/// 3. collapse whitespace, lowercase, trim.
///
/// With `for_embedding`, tokens shorter than `rules.min_token_len` are removed unless
/// listed in `rules.keep_tokens`, and tokens listed in `rules.drop_tokens` are always removed.
pub fn normalize(raw: &str, for_embedding: bool, rules: &NormalizerRules) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let spaced: String = fold_to_ascii(raw)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let tokens = spaced.split_whitespace();
    if !for_embedding {
        return tokens.collect::<Vec<_>>().join(" ");
    }

    tokens
        .filter(|t| keep_for_embedding(t, rules))
        .collect::<Vec<_>>()
        .join(" ")
}

fn keep_for_embedding(token: &str, rules: &NormalizerRules) -> bool {
    if rules.drop_tokens.iter().any(|d| d == token) {
        return false;
    }
    token.len() >= rules.min_token_len || rules.keep_tokens.iter().any(|k| k == token)
}

/// Strip diacritics. `đ`/`Đ` have no canonical decomposition, so they are mapped by hand.
fn fold_to_ascii(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .nfkd()
        .filter(|c| c.is_ascii())
        .collect()
}
