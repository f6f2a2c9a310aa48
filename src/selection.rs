use crate::catalog::Video;
use crate::progress::{is_seen, ProgressMap};

/// Playback order: newest first by `created_at`, ties keeping catalog order.
/// The administrative `order` field is deliberately not consulted; the
/// catalog editor sorts by it, playback never has.
pub fn sort_newest_first(catalog: &[Video]) -> Vec<&Video> {
    let mut sorted: Vec<&Video> = catalog.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

fn first_unseen_or_first<'a>(sorted: &[&'a Video], progress: &ProgressMap) -> Option<&'a Video> {
    sorted
        .iter()
        .find(|v| !is_seen(progress, &v.id))
        .copied()
        .or_else(|| sorted.first().copied())
}

/// What to play when nothing is playing yet: the newest unseen video, the
/// newest video overall when everything has been seen, or nothing for an
/// empty catalog.
pub fn initial_pick<'a>(catalog: &'a [Video], progress: &ProgressMap) -> Option<&'a Video> {
    let sorted = sort_newest_first(catalog);
    first_unseen_or_first(&sorted, progress)
}

/// Next video after `current_id` (natural end or manual skip): the first
/// unseen video strictly after the current position, else the first unseen
/// one before it, else simply the next entry with wraparound.
///
/// Total for any non-empty catalog: an id that is not in the catalog scans
/// from the top and falls back to the first entry.
pub fn advance_forward<'a>(
    catalog: &'a [Video],
    progress: &ProgressMap,
    current_id: &str,
) -> Option<&'a Video> {
    let sorted = sort_newest_first(catalog);
    if sorted.is_empty() {
        return None;
    }

    let current = sorted.iter().position(|v| v.id == current_id);
    let after = current.map(|i| i + 1).unwrap_or(0);

    if let Some(next) = sorted[after..].iter().find(|v| !is_seen(progress, &v.id)) {
        return Some(next);
    }
    if let Some(next) = sorted[..current.unwrap_or(0)]
        .iter()
        .find(|v| !is_seen(progress, &v.id))
    {
        return Some(next);
    }

    let next = match current {
        Some(i) if i + 1 < sorted.len() => i + 1,
        _ => 0,
    };
    Some(sorted[next])
}

/// Previous video in playback order, wrapping from the first entry to the
/// last. Seen status is not consulted; going back means going back.
pub fn advance_backward<'a>(catalog: &'a [Video], current_id: &str) -> Option<&'a Video> {
    let sorted = sort_newest_first(catalog);
    if sorted.is_empty() {
        return None;
    }

    let prev = match sorted.iter().position(|v| v.id == current_id) {
        Some(i) if i > 0 => i - 1,
        _ => sorted.len() - 1,
    };
    Some(sorted[prev])
}

/// Replacement after `failed_id` faulted: the initial pick over the catalog
/// without the failed video. None means nothing else is playable.
pub fn skip_on_error<'a>(
    catalog: &'a [Video],
    progress: &ProgressMap,
    failed_id: &str,
) -> Option<&'a Video> {
    let remaining: Vec<&Video> = sort_newest_first(catalog)
        .into_iter()
        .filter(|v| v.id != failed_id)
        .collect();
    first_unseen_or_first(&remaining, progress)
}
