use serde::Deserialize;

use crate::dispatch::ResultBundle;

#[derive(Deserialize)]
struct SearchEnvelope {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    total: TotalHits,
}

/// `hits.total` is an object on current backends and a bare integer on older ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Tracked { value: i64 },
    Legacy(i64),
}

/// Reads `hits.total.value`, or `None` if the payload does not have that shape.
pub fn hit_count(payload: &str) -> Option<i64> {
    let envelope: SearchEnvelope = serde_json::from_str(payload).ok()?;
    Some(match envelope.hits.total {
        TotalHits::Tracked { value } => value,
        TotalHits::Legacy(value) => value,
    })
}

/// True when the payload reports no hits. Unreadable payloads count as empty.
pub fn has_no_hits(payload: &str) -> bool {
    match hit_count(payload) {
        Some(total) => total <= 0,
        None => {
            log::warn!("réponse sans hits.total lisible, traitée comme vide");
            true
        }
    }
}

/// True unless at least one payload of the bundle has a positive hit count.
pub fn is_response_empty(bundle: &ResultBundle) -> bool {
    bundle.values().all(|payload| has_no_hits(payload))
}
