//! "Did you mean" suggestions for misspelled names.

use strsim::levenshtein;

use crate::constants::SIMILARITY_THRESHOLD_PERCENT;

/// Find names similar to `target`, closest first.
///
/// Returns at most three candidates whose Levenshtein distance is within
/// [`SIMILARITY_THRESHOLD_PERCENT`] of the target length.
pub fn find_similar<'a, I>(target: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let max_distance = (target.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);

    let mut scored: Vec<_> = candidates
        .into_iter()
        .filter(|candidate| *candidate != target)
        .map(|candidate| (candidate, levenshtein(target, candidate)))
        .filter(|(_, distance)| *distance <= max_distance)
        .collect();

    scored.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));

    scored.into_iter().take(3).map(|(name, _)| name.to_string()).collect()
}

/// The single closest name to `target`, if any is similar enough.
pub fn best_match<'a, I>(target: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    find_similar(target, candidates).into_iter().next()
}
