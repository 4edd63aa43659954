//! Answer resolution from page statistics.
//!
//! The page exposes, per item, how many times each alternative was chosen by
//! the account. The alternative that was hit is the one the key records. The
//! first alternative with `hit > 0` in page order wins, not the most voted.

use crate::types::{AlternativeStat, AnswerKey, StatBlob, StatRecord};

/// First alternative with a positive hit count, in the order given.
pub fn first_hit(stats: &[AlternativeStat]) -> Option<&AlternativeStat> {
    stats.iter().find(|s| s.hit > 0)
}

/// Decode a raw statistics payload.
pub fn parse_stats(payload: &str) -> Result<Vec<AlternativeStat>, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Trimmed and with embedded newlines dropped, as numbers are displayed.
pub fn normalize_number(raw: &str) -> String {
    raw.trim().replace(['\n', '\r'], "")
}

/// Build the answer key of one page from its raw statistic blobs.
///
/// A blob without a number is keyed by its 1-based position in `blobs`. A
/// blob whose payload cannot be decoded is skipped; the others still resolve.
pub fn resolve(blobs: &[StatBlob]) -> AnswerKey {
    let mut key = AnswerKey::new();
    for (index, blob) in blobs.iter().enumerate() {
        let number = item_number_or_ordinal(blob.item_number.as_deref(), index);
        let stats = match parse_stats(&blob.payload) {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(
                    position = index + 1,
                    item = %number,
                    error = %err,
                    "skipping unreadable statistics"
                );
                continue;
            }
        };
        match first_hit(&stats) {
            Some(hit) => key.insert(number, hit.id.clone()),
            None => tracing::debug!(item = %number, "no alternative hit"),
        }
    }
    tracing::debug!(resolved = key.len(), total = blobs.len(), "answer key built");
    key
}

/// Same as [`resolve`] for statistics that were already decoded.
pub fn resolve_records(records: &[StatRecord]) -> AnswerKey {
    let mut key = AnswerKey::new();
    for (index, record) in records.iter().enumerate() {
        if let Some(hit) = first_hit(&record.alternative_stats) {
            let number = item_number_or_ordinal(Some(&record.item_number), index);
            key.insert(number, hit.id.clone());
        }
    }
    key
}

fn item_number_or_ordinal(raw: Option<&str>, index: usize) -> String {
    let number = raw.map(normalize_number).unwrap_or_default();
    if number.is_empty() {
        (index + 1).to_string()
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob(number: &str, stats: serde_json::Value) -> StatBlob {
        StatBlob::new(number, stats.to_string())
    }

    #[test]
    fn first_positive_hit_wins_over_max() {
        let key = resolve(&[blob(
            "1",
            json!([{"id":"A","hit":0},{"id":"B","hit":3},{"id":"C","hit":5}]),
        )]);
        assert_eq!(key.get("1"), Some("B"));
    }

    #[test]
    fn no_hits_means_no_entry() {
        let key = resolve(&[blob("1", json!([{"id":"A","hit":0},{"id":"B","hit":0}]))]);
        assert!(key.is_empty());
        let key = resolve(&[blob("2", json!([]))]);
        assert!(key.is_empty());
    }

    #[test]
    fn malformed_payload_does_not_stop_the_scan() {
        let blobs = vec![
            blob("1", json!([{"id":"C","hit":1}])),
            StatBlob::new("2", "{not json"),
            StatBlob::new("3", r#"[{"id":"A","hit":"lots"}]"#),
            blob("4", json!([{"id":"D","hit":2}])),
        ];
        let key = resolve(&blobs);
        assert_eq!(key.summary(), "1:C, 4:D");
    }

    #[test]
    fn missing_number_falls_back_to_position() {
        let blobs = vec![
            blob("10", json!([{"id":"A","hit":1}])),
            StatBlob {
                item_number: None,
                payload: json!([{"id":"E","hit":1}]).to_string(),
            },
            StatBlob {
                item_number: Some("  \n".into()),
                payload: json!([{"id":"B","hit":1}]).to_string(),
            },
        ];
        let key = resolve(&blobs);
        assert_eq!(key.get("2"), Some("E"));
        assert_eq!(key.get("3"), Some("B"));
        assert_eq!(key.get("10"), Some("A"));
    }

    #[test]
    fn numbers_are_normalized() {
        let key = resolve(&[blob(" 1\n2 ", json!([{"id":"A","hit":1}]))]);
        assert_eq!(key.get("12"), Some("A"));
    }

    #[test]
    fn keys_are_a_subset_of_input_numbers() {
        let blobs: Vec<StatBlob> = (1..=20)
            .map(|n| {
                let payload = if n % 3 == 0 {
                    "garbage".to_string()
                } else {
                    json!([{"id":"A","hit": n % 2}]).to_string()
                };
                StatBlob::new(format!("Q{n}"), payload)
            })
            .collect();
        let key = resolve(&blobs);
        let inputs: Vec<String> = blobs.iter().filter_map(|b| b.item_number.clone()).collect();
        assert!(!key.is_empty());
        for (number, _) in key.iter() {
            assert!(inputs.iter().any(|n| n == number), "{number} not in input");
        }
    }

    #[test]
    fn resolve_records_uses_same_rule() {
        let records = vec![
            StatRecord {
                item_number: "5".into(),
                alternative_stats: vec![
                    AlternativeStat::new("A", 0),
                    AlternativeStat::new("B", 3),
                    AlternativeStat::new("C", 5),
                ],
            },
            StatRecord {
                item_number: String::new(),
                alternative_stats: vec![AlternativeStat::new("D", 1)],
            },
        ];
        let key = resolve_records(&records);
        assert_eq!(key.get("5"), Some("B"));
        assert_eq!(key.get("2"), Some("D"));
    }

    #[test]
    fn empty_input_gives_empty_key() {
        assert!(resolve(&[]).is_empty());
    }
}
