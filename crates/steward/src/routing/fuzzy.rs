use crate::capability::CapabilityBinding;
use crate::command::parser::{is_stopword, ParsedPhrase};

/// Minimum token length considered for fuzzy comparison; shorter tokens are
/// too easy to bridge within tolerance.
const MIN_TOKEN_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub binding_index: usize,
    pub keyword: String,
    pub token: String,
    pub distance: usize,
}

/// Closest-match pass over every known single-word keyword. A candidate is
/// accepted when its edit distance is within `tolerance` and under half the
/// keyword length, so short keywords cannot be reached from arbitrary noise.
/// Ties prefer the binding with the smaller keyword set.
pub fn closest_binding(
    parsed: &ParsedPhrase,
    bindings: &[CapabilityBinding],
    tolerance: usize,
) -> Option<FuzzyMatch> {
    let mut best: Option<(FuzzyMatch, usize)> = None;

    for token in &parsed.lowercase {
        if is_stopword(token) || token.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        for (binding_index, binding) in bindings.iter().enumerate() {
            for keyword in &binding.keywords {
                if keyword.contains(' ') {
                    continue;
                }
                let distance = levenshtein(token, keyword);
                if distance > tolerance || 2 * distance >= keyword.chars().count() {
                    continue;
                }
                let candidate = (
                    FuzzyMatch {
                        binding_index,
                        keyword: keyword.clone(),
                        token: token.clone(),
                        distance,
                    },
                    binding.keywords.len(),
                );
                let closer = match &best {
                    None => true,
                    Some((current, keyword_count)) => {
                        distance < current.distance
                            || (distance == current.distance && candidate.1 < *keyword_count)
                    }
                };
                if closer {
                    best = Some(candidate);
                }
            }
        }
    }

    best.map(|(found, _)| found)
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (prev[j + 1] + 1)
                .min(current[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
