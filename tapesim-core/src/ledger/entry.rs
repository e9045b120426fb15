use crate::core::{AssetId, FillId};
use crate::execution::Fill;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Append-only ledger record
///
/// Serialized as one flat JSON object per line, e.g.
/// `{"entry_id":3,"cursor":4,"kind":"fee","fill_id":1,"asset_id":"A","amount":"0.05"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: u64,
    /// Session cursor at which the entry was recorded
    pub cursor: u64,
    #[serde(flatten)]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// Cash added to the account (starting cash)
    Deposit { amount: Decimal },
    /// Executed fill; moves cash by notional and changes the position
    Fill { fill: Fill },
    /// Fee charged on a fill
    Fee {
        fill_id: FillId,
        asset_id: AssetId,
        amount: Decimal,
    },
    /// Mark-to-market price for an asset; no cash movement
    Mark { asset_id: AssetId, price: Decimal },
}

impl EntryKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntryKind::Deposit { .. } => "deposit",
            EntryKind::Fill { .. } => "fill",
            EntryKind::Fee { .. } => "fee",
            EntryKind::Mark { .. } => "mark",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_json_is_flat() {
        let entry = LedgerEntry {
            entry_id: 3,
            cursor: 4,
            kind: EntryKind::Fee {
                fill_id: FillId(1),
                asset_id: "A".into(),
                amount: dec!(0.05),
            },
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"entry_id":3,"cursor":4,"kind":"fee","fill_id":1,"asset_id":"A","amount":"0.05"}"#
        );
        let back: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_mark_entry_parses() {
        let entry: LedgerEntry = serde_json::from_str(
            r#"{"entry_id":9,"cursor":12,"kind":"mark","asset_id":"B","price":"0.47"}"#,
        )
        .unwrap();
        assert_eq!(entry.kind.name(), "mark");
        assert_eq!(
            entry.kind,
            EntryKind::Mark {
                asset_id: "B".into(),
                price: dec!(0.47)
            }
        );
    }
}
