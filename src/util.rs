use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Collapses whitespace runs and cuts `text` to at most `budget` characters,
/// marking the cut with an ellipsis.
pub fn truncate_label(text: &str, budget: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= budget {
        return collapsed;
    }

    let mut truncated = collapsed
        .chars()
        .take(budget.saturating_sub(1))
        .collect::<String>();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('…');
    truncated
}

/// A deterministic pseudo-random point in `[-1, 1]²` derived from `id`.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}
