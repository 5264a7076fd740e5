//! Token-order-insensitive string similarity
//!
//! Both strings are lower-cased, every non-alphanumeric character becomes a
//! separator, and the tokens are sorted and re-joined with single spaces.
//! The score is the normalized indel similarity of the two processed
//! strings: `100 * 2 * LCS / (len_a + len_b)` over characters, rounded half
//! to even.

/// Normalize `s` into its sorted-token form
pub fn sorted_tokens(s: &str) -> String {
    let lowered: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// A string already in sorted-token form, for scoring against many others
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedTokens {
    chars: Vec<char>,
}

impl SortedTokens {
    pub fn new(s: &str) -> Self {
        Self {
            chars: sorted_tokens(s).chars().collect(),
        }
    }

    /// Length in characters of the sorted-token form
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// Similarity of `a` and `b` in `0..=100`, ignoring token order
///
/// Returns 0 when either side has no tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&SortedTokens::new(a), &SortedTokens::new(b))
}

/// `token_sort_ratio` over pre-sorted inputs
pub fn ratio(a: &SortedTokens, b: &SortedTokens) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let lcs = lcs_len(&a.chars, &b.chars);
    scaled(lcs, a.len() + b.len())
}

/// Highest score two sorted strings of these lengths can reach
///
/// The LCS never exceeds the shorter side, so this bound lets a caller skip
/// the quadratic comparison when the lengths alone rule a candidate out.
pub fn ratio_upper_bound(len_a: usize, len_b: usize) -> u8 {
    if len_a == 0 || len_b == 0 {
        return 0;
    }
    scaled(len_a.min(len_b), len_a + len_b)
}

// 200 * lcs / total, rounded half to even
fn scaled(lcs: usize, total: usize) -> u8 {
    let numerator = 200 * lcs as u64;
    let total = total as u64;
    let (mut quotient, remainder) = (numerator / total, numerator % total);
    if 2 * remainder > total || (2 * remainder == total && quotient % 2 == 1) {
        quotient += 1;
    }
    quotient.min(100) as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
