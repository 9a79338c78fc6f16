//! Query evaluation over an index snapshot.

use crate::data::AreaIndexData;
use crate::entry::AreaIndexEntry;

/// Case-sensitive substring match on area names, in index order.
///
/// No case folding and no ranking. An empty term matches every entry.
pub fn search_entries(data: &AreaIndexData, term: &str, limit: Option<usize>) -> Vec<AreaIndexEntry> {
    let matches = data
        .entries()
        .iter()
        .filter(|entry| entry.name.contains(term))
        .cloned();
    match limit {
        Some(limit) => matches.take(limit).collect(),
        None => matches.collect(),
    }
}
