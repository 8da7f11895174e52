//! Fuzzy string scoring used to resolve what users type into dataset values.
//!
//! Scores are on a 0-100 scale. `ratio` is the normalised Indel similarity of
//! two strings; `partial_ratio` is the best `ratio` of the shorter string
//! against any same-length window of the longer one, which lets "PATNA" match
//! "PATNA MAIN BRANCH" with a perfect score.

use std::collections::HashMap;

/// Patterns up to this many chars use the bit-parallel LCS.
const WORD_BITS: usize = 64;

/// 最長共同子序列長度 (滾動陣列)
fn lcs_len_dp(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
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

/// Per-character position masks of a pattern of at most `WORD_BITS` chars.
///
/// LCS against any text then costs one pass over the text (Hyyrö's
/// bit-vector algorithm), so a pattern can be scored against many windows
/// without rebuilding the masks.
struct PatternMask {
    masks: HashMap<char, u64>,
    len: usize,
}

impl PatternMask {
    fn new(pattern: &[char]) -> Option<Self> {
        if pattern.len() > WORD_BITS {
            return None;
        }
        let mut masks: HashMap<char, u64> = HashMap::new();
        for (i, &c) in pattern.iter().enumerate() {
            *masks.entry(c).or_default() |= 1u64 << i;
        }
        Some(Self {
            masks,
            len: pattern.len(),
        })
    }

    fn lcs_len(&self, text: &[char]) -> usize {
        if self.len == 0 {
            return 0;
        }
        let mut v = u64::MAX;
        for c in text {
            let matches = self.masks.get(c).copied().unwrap_or(0);
            let u = v & matches;
            // u 是 v 的子集，減法不會溢位
            v = v.wrapping_add(u) | (v - u);
        }
        let used = if self.len == WORD_BITS {
            u64::MAX
        } else {
            (1u64 << self.len) - 1
        };
        (!v & used).count_ones() as usize
    }
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    match PatternMask::new(shorter) {
        Some(mask) => mask.lcs_len(longer),
        None => lcs_len_dp(a, b),
    }
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn partial_ratio_ordered(shorter: &[char], longer: &[char]) -> f64 {
    let m = shorter.len();
    let n = longer.len();
    let mask = PatternMask::new(shorter);
    let mut best = 0.0f64;

    let mut consider = |window: &[char]| {
        let common = match &mask {
            Some(mask) => mask.lcs_len(window),
            None => lcs_len_dp(shorter, window),
        };
        let score = 200.0 * common as f64 / (m + window.len()) as f64;
        if score > best {
            best = score;
        }
        best >= 100.0
    };

    // 左側不完整視窗
    for end in 1..m {
        if consider(&longer[..end]) {
            return 100.0;
        }
    }
    for start in 0..=(n - m) {
        if consider(&longer[start..start + m]) {
            return 100.0;
        }
    }
    // 右側不完整視窗
    for start in (n - m + 1)..n {
        if consider(&longer[start..]) {
            return 100.0;
        }
    }
    best
}

pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a.len() < b.len() {
        partial_ratio_ordered(&a, &b)
    } else if a.len() > b.len() {
        partial_ratio_ordered(&b, &a)
    } else {
        partial_ratio_ordered(&a, &b).max(partial_ratio_ordered(&b, &a))
    }
}

/// Best scoring choice as `(choice, score, index)`. Ties keep the earliest
/// choice.
pub fn extract_one<'a, S: AsRef<str>>(query: &str, choices: &'a [S]) -> Option<(&'a str, f64, usize)> {
    let mut best: Option<(&'a str, f64, usize)> = None;
    for (index, choice) in choices.iter().enumerate() {
        let choice = choice.as_ref();
        let score = partial_ratio(query, choice);
        match best {
            Some((_, best_score, _)) if score <= best_score => {}
            _ => best = Some((choice, score, index)),
        }
        if score >= 100.0 {
            break;
        }
    }
    best
}
