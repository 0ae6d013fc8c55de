//! parted argument emission
//!
//! Produces the positional arguments parted expects after the device path:
//! a `mklabel <scheme>` directive followed by `mkpart <name> <start> <end>`
//! for every entry, in order.

use crate::disk::planner::{BoundaryEntry, Offset, PartitionTable};
use crate::utils::error::PlannerError;

/// Render `entries` as parted `mklabel`/`mkpart` tokens
pub fn emit(scheme: PartitionTable, entries: &[BoundaryEntry]) -> Result<Vec<String>, PlannerError> {
    if entries.is_empty() {
        return Err(PlannerError::EmptyLayout);
    }

    let mut tokens = Vec::with_capacity(2 + entries.len() * 4);
    tokens.push("mklabel".to_string());
    tokens.push(scheme.token().to_string());

    for entry in entries {
        for offset in [entry.start(), entry.end()] {
            if let Offset::Percent(pct) = offset {
                if pct > 100 {
                    return Err(PlannerError::InvalidPercentage(pct));
                }
            }
        }
        tokens.push("mkpart".to_string());
        tokens.push(scheme.mkpart_name().to_string());
        tokens.push(entry.start().to_string());
        tokens.push(entry.end().to_string());
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_layout_is_rejected() {
        assert_eq!(emit(PartitionTable::Gpt, &[]), Err(PlannerError::EmptyLayout));
    }

    #[test]
    fn emits_label_then_one_group_per_entry() {
        let entries = [
            BoundaryEntry::new(Offset::Percent(0), Offset::Bytes(1_074_790_400)),
            BoundaryEntry::new(Offset::Bytes(1_074_790_400), Offset::Bytes(35_433_480_192)),
            BoundaryEntry::new(Offset::Bytes(35_433_480_192), Offset::Percent(100)),
        ];

        let tokens = emit(PartitionTable::Gpt, &entries).unwrap();
        assert_eq!(tokens.len(), 2 + 3 * 4);
        assert_eq!(&tokens[..2], ["mklabel", "gpt"]);
        assert_eq!(&tokens[6..10], ["mkpart", "none", "1074790400B", "35433480192B"]);
        assert_eq!(tokens.last().map(String::as_str), Some("100%"));
    }

    #[test]
    fn msdos_uses_primary_partition_type() {
        let entries = [BoundaryEntry::new(Offset::Percent(0), Offset::Percent(100))];

        let tokens = emit(PartitionTable::Mbr, &entries).unwrap();
        assert_eq!(tokens, ["mklabel", "msdos", "mkpart", "primary", "0%", "100%"]);
    }

    #[test]
    fn percentage_past_device_end_is_rejected() {
        let entries = [
            BoundaryEntry::new(Offset::Percent(0), Offset::Bytes(2 << 20)),
            BoundaryEntry::new(Offset::Bytes(2 << 20), Offset::Percent(101)),
        ];
        assert_eq!(
            emit(PartitionTable::Gpt, &entries),
            Err(PlannerError::InvalidPercentage(101))
        );

        let entries = [BoundaryEntry::new(Offset::Percent(200), Offset::Percent(100))];
        assert_eq!(
            emit(PartitionTable::Mbr, &entries),
            Err(PlannerError::InvalidPercentage(200))
        );
    }
}
