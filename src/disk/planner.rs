//! Partition layout planning
//!
//! A [`LayoutPlanner`] turns a device capacity and an ordered list of
//! partition sizes into a contiguous chain of [`BoundaryEntry`] values.
//! The first partition is pushed back by a fixed 1 MiB so bootloader
//! structures fit ahead of it; the last partition may be stretched to a
//! percentage of the device when the layout is finalized.
//!
//! Planning is pure: nothing here touches the device or logs.

use crate::disk::emitter;
use crate::disk::size::{Size, Unit};
use crate::utils::error::PlannerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Space reserved ahead of the first partition boundary
pub const FIRST_PARTITION_OFFSET: Size = Size::MIB;

/// On-disk partition table format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PartitionTable {
    #[default]
    #[serde(rename = "gpt")]
    Gpt,
    #[serde(rename = "msdos", alias = "mbr")]
    Mbr,
}

impl PartitionTable {
    /// Label name understood by parted's `mklabel`
    pub fn token(self) -> &'static str {
        match self {
            Self::Gpt => "gpt",
            Self::Mbr => "msdos",
        }
    }

    /// First `mkpart` argument: a partition name on GPT, a partition type on msdos
    pub fn mkpart_name(self) -> &'static str {
        match self {
            Self::Gpt => "none",
            Self::Mbr => "primary",
        }
    }
}

impl fmt::Display for PartitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpt => write!(f, "GPT"),
            Self::Mbr => write!(f, "MBR (msdos)"),
        }
    }
}

/// A position on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Absolute byte offset
    Bytes(u64),
    /// Percentage of the whole device
    Percent(u8),
}

impl Offset {
    /// Absolute byte position on a device of `device_size`
    pub fn resolve(self, device_size: Size) -> u64 {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Percent(pct) => (device_size.to_bytes() as u128 * pct as u128 / 100) as u64,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "{}B", bytes),
            Self::Percent(pct) => write!(f, "{}%", pct),
        }
    }
}

/// One planned partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryEntry {
    start: Offset,
    end: Offset,
}

impl BoundaryEntry {
    pub(crate) fn new(start: Offset, end: Offset) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> Offset {
        self.start
    }

    pub fn end(&self) -> Offset {
        self.end
    }

    /// Resolved length of this partition on a device of `device_size`
    pub fn size(&self, device_size: Size) -> Size {
        Size::from_bytes(
            self.end
                .resolve(device_size)
                .saturating_sub(self.start.resolve(device_size)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Open,
    Finalized,
}

/// Mutable planning session for a single device
#[derive(Debug)]
pub struct LayoutPlanner {
    device_size: Size,
    scheme: PartitionTable,
    entries: Vec<BoundaryEntry>,
    /// Absolute end of the last entry; every end is absolute while Open
    cursor: u64,
    state: PlannerState,
}

impl LayoutPlanner {
    /// Start a layout whose first partition spans `0%` to `first_partition_size + 1MiB`
    pub fn new(
        device_size: Size,
        scheme: PartitionTable,
        first_partition_size: Size,
    ) -> Result<Self, PlannerError> {
        if device_size.is_zero() {
            return Err(PlannerError::InvalidDevice(
                "device reports a size of zero bytes".to_string(),
            ));
        }

        let first_end = first_partition_size
            .checked_add(FIRST_PARTITION_OFFSET)
            .filter(|end| *end <= device_size)
            .ok_or_else(|| {
                PlannerError::InvalidDevice(format!(
                    "first partition of {} plus the {} offset does not fit on a {} device",
                    first_partition_size.human(),
                    FIRST_PARTITION_OFFSET,
                    device_size.human()
                ))
            })?;

        Ok(Self {
            device_size,
            scheme,
            entries: vec![BoundaryEntry::new(
                Offset::Percent(0),
                Offset::Bytes(first_end.to_bytes()),
            )],
            cursor: first_end.to_bytes(),
            state: PlannerState::Open,
        })
    }

    /// Append a partition of `size` directly after the last one.
    ///
    /// On failure the planner is left untouched.
    pub fn append(&mut self, size: Size) -> Result<(), PlannerError> {
        if self.state != PlannerState::Open {
            return Err(PlannerError::InvalidState(
                "cannot append to a finalized layout",
            ));
        }
        if size.is_zero() {
            return Err(PlannerError::InvalidSize(
                "cannot append a zero-length partition".to_string(),
            ));
        }

        let start = self.cursor;
        let end = start
            .checked_add(size.to_bytes())
            .filter(|end| *end <= self.device_size.to_bytes())
            .ok_or_else(|| self.out_of_space(start, size))?;

        self.entries
            .push(BoundaryEntry::new(Offset::Bytes(start), Offset::Bytes(end)));
        self.cursor = end;
        Ok(())
    }

    fn out_of_space(&self, start: u64, size: Size) -> PlannerError {
        let mib = Unit::MiB.multiplier() as f64;
        PlannerError::OutOfSpace {
            from_mib: (start as f64 / mib).round() as u64,
            to_mib: ((start as f64 + size.to_bytes() as f64) / mib).round() as u64,
            device_mb: self.device_size.to_unit(Unit::MB, 2),
        }
    }

    /// Fix the layout, optionally letting the last partition end at
    /// `remainder_percentage` of the device.
    ///
    /// A rejected percentage leaves the planner open so the call can be retried.
    pub fn finalize(&mut self, remainder_percentage: Option<u8>) -> Result<Layout, PlannerError> {
        if self.state != PlannerState::Open {
            return Err(PlannerError::InvalidState("layout is already finalized"));
        }

        let mut entries = self.entries.clone();
        if let Some(pct) = remainder_percentage {
            if pct == 0 || pct > 100 {
                return Err(PlannerError::InvalidPercentage(pct));
            }
            if let Some(last) = entries.last_mut() {
                let end = Offset::Percent(pct);
                // The stretched partition must still end past its own start
                if end.resolve(self.device_size) <= last.start.resolve(self.device_size) {
                    return Err(PlannerError::InvalidPercentage(pct));
                }
                last.end = end;
            }
        }

        self.entries = entries.clone();
        self.state = PlannerState::Finalized;

        Ok(Layout {
            scheme: self.scheme,
            device_size: self.device_size,
            entries,
        })
    }

    pub fn entries(&self) -> &[BoundaryEntry] {
        &self.entries
    }

    pub fn device_size(&self) -> Size {
        self.device_size
    }

    pub fn scheme(&self) -> PartitionTable {
        self.scheme
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Capacity left after the last planned partition
    pub fn remaining(&self) -> Size {
        self.device_size.saturating_sub(Size::from_bytes(self.cursor))
    }
}

/// A finalized, immutable boundary list
///
/// Turning it into tokens consumes it, so a layout is emitted at most once.
#[derive(Debug, PartialEq)]
pub struct Layout {
    scheme: PartitionTable,
    device_size: Size,
    entries: Vec<BoundaryEntry>,
}

impl Layout {
    pub fn scheme(&self) -> PartitionTable {
        self.scheme
    }

    pub fn device_size(&self) -> Size {
        self.device_size
    }

    pub fn entries(&self) -> &[BoundaryEntry] {
        &self.entries
    }

    /// Render the parted label and mkpart tokens for this layout
    pub fn into_tokens(self) -> Result<Vec<String>, PlannerError> {
        emitter::emit(self.scheme, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::size::BinaryUnit;

    fn mib(n: f64) -> Size {
        Size::from_binary(n, BinaryUnit::MiB).unwrap()
    }

    /// 200,000 MiB GPT device with a 1,024 MiB first partition
    fn scenario_planner() -> LayoutPlanner {
        LayoutPlanner::new(mib(200_000.0), PartitionTable::Gpt, mib(1024.0)).unwrap()
    }

    fn assert_contiguous(entries: &[BoundaryEntry], device: Size) {
        for pair in entries.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for entry in entries {
            assert!(entry.start.resolve(device) < entry.end.resolve(device));
        }
    }

    #[test]
    fn new_seeds_first_partition_with_offset() {
        let planner = scenario_planner();
        assert_eq!(
            planner.entries(),
            &[BoundaryEntry {
                start: Offset::Percent(0),
                end: Offset::Bytes((1024 + 1) * 1024 * 1024),
            }]
        );
        assert_eq!(planner.entries()[0].start.resolve(planner.device_size()), 0);
        assert_eq!(planner.state(), PlannerState::Open);
    }

    #[test]
    fn new_rejects_zero_device() {
        let err = LayoutPlanner::new(Size::ZERO, PartitionTable::Gpt, mib(1.0)).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidDevice(_)));
    }

    #[test]
    fn new_rejects_first_partition_that_does_not_fit() {
        // Exactly filling the device with the offset is fine, one byte more is not
        assert!(LayoutPlanner::new(mib(100.0), PartitionTable::Gpt, mib(99.0)).is_ok());
        let err = LayoutPlanner::new(
            mib(100.0),
            PartitionTable::Gpt,
            mib(99.0) + Size::from_bytes(1),
        )
        .unwrap_err();
        assert!(matches!(err, PlannerError::InvalidDevice(_)));

        let err = LayoutPlanner::new(mib(100.0), PartitionTable::Mbr, Size::from_bytes(u64::MAX))
            .unwrap_err();
        assert!(matches!(err, PlannerError::InvalidDevice(_)));
    }

    #[test]
    fn append_continues_from_previous_end() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();

        let entries = planner.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].start, entries[0].end);
        assert_eq!(
            entries[1].end,
            Offset::Bytes((1025 + 32768) * 1024 * 1024)
        );
        assert_eq!(planner.remaining(), mib(200_000.0 - 1025.0 - 32768.0));
    }

    #[test]
    fn appends_form_contiguous_chain() {
        let mut planner = scenario_planner();
        for size in ["512MiB", "32GiB", "1.5GB", "4097", "64GiB"] {
            planner.append(size.parse().unwrap()).unwrap();
        }
        assert_eq!(planner.entries().len(), 6);
        assert_contiguous(planner.entries(), planner.device_size());
    }

    #[test]
    fn append_out_of_space_leaves_state_unchanged() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();
        let before = planner.entries().to_vec();

        let err = planner.append(mib(300_000.0)).unwrap_err();
        match err {
            PlannerError::OutOfSpace {
                from_mib,
                to_mib,
                device_mb,
            } => {
                assert_eq!(from_mib, 33793);
                assert_eq!(to_mib, 333793);
                assert!((device_mb - 209_715.2).abs() < 1e-6);
            }
            other => panic!("expected OutOfSpace, got {:?}", other),
        }
        assert_eq!(planner.entries(), before.as_slice());

        // A smaller retry still fits where the failed one would have gone
        planner.append(mib(1000.0)).unwrap();
        assert_eq!(planner.entries()[2].start, before[1].end);
    }

    #[test]
    fn append_can_fill_device_exactly() {
        let mut planner = scenario_planner();
        let rest = planner.remaining();
        planner.append(rest).unwrap();
        assert_eq!(planner.remaining(), Size::ZERO);
        assert!(matches!(
            planner.append(Size::from_bytes(1)),
            Err(PlannerError::OutOfSpace { .. })
        ));
    }

    #[test]
    fn append_rejects_zero_length() {
        let mut planner = scenario_planner();
        assert!(matches!(
            planner.append(Size::ZERO),
            Err(PlannerError::InvalidSize(_))
        ));
        assert_eq!(planner.entries().len(), 1);
    }

    #[test]
    fn append_overflow_is_out_of_space() {
        let mut planner = scenario_planner();
        assert!(matches!(
            planner.append(Size::from_bytes(u64::MAX)),
            Err(PlannerError::OutOfSpace { .. })
        ));
    }

    #[test]
    fn finalize_percentage_rewrites_only_last_end() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();
        planner.append(mib(65536.0)).unwrap();
        let before = planner.entries().to_vec();

        let layout = planner.finalize(Some(100)).unwrap();
        let after = layout.entries();

        assert_eq!(after.len(), before.len());
        assert_eq!(&after[..2], &before[..2]);
        assert_eq!(after[2].start, before[2].start);
        assert_eq!(after[2].end, Offset::Percent(100));
        assert_eq!(planner.state(), PlannerState::Finalized);
    }

    #[test]
    fn finalize_without_percentage_keeps_absolute_ends() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();
        let before = planner.entries().to_vec();

        let layout = planner.finalize(None).unwrap();
        assert_eq!(layout.entries(), before.as_slice());
        assert_eq!(layout.scheme(), PartitionTable::Gpt);
        assert_eq!(layout.device_size(), mib(200_000.0));
    }

    #[test]
    fn finalize_rejects_out_of_range_percentage_and_allows_retry() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();

        assert_eq!(planner.finalize(Some(0)), Err(PlannerError::InvalidPercentage(0)));
        assert_eq!(planner.finalize(Some(101)), Err(PlannerError::InvalidPercentage(101)));
        assert_eq!(planner.state(), PlannerState::Open);

        assert!(planner.finalize(Some(90)).is_ok());
    }

    #[test]
    fn finalize_rejects_percentage_before_last_start() {
        let mut planner = scenario_planner();
        // Last partition starts at roughly 50% of the device
        planner.append(mib(99_000.0)).unwrap();
        planner.append(mib(10_000.0)).unwrap();

        assert_eq!(planner.finalize(Some(40)), Err(PlannerError::InvalidPercentage(40)));
        assert_eq!(planner.entries()[2].end, Offset::Bytes((1025 + 109_000) * 1024 * 1024));
        assert!(planner.finalize(Some(60)).is_ok());
    }

    #[test]
    fn finalize_twice_is_invalid_state() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();
        let first = planner.finalize(Some(100)).unwrap();
        let snapshot = first.entries().to_vec();

        assert!(matches!(
            planner.finalize(None),
            Err(PlannerError::InvalidState(_))
        ));
        assert_eq!(first.entries(), snapshot.as_slice());
    }

    #[test]
    fn append_after_finalize_is_invalid_state() {
        let mut planner = scenario_planner();
        planner.finalize(None).unwrap();
        assert!(matches!(
            planner.append(mib(1.0)),
            Err(PlannerError::InvalidState(_))
        ));
        assert_eq!(planner.entries().len(), 1);
    }

    #[test]
    fn finalized_layout_renders_remainder_as_percentage() {
        let mut planner = scenario_planner();
        planner.append(mib(32768.0)).unwrap();
        let tokens = planner.finalize(Some(100)).unwrap().into_tokens().unwrap();

        assert_eq!(
            tokens,
            vec![
                "mklabel",
                "gpt",
                "mkpart",
                "none",
                "0%",
                "1074790400B",
                "mkpart",
                "none",
                "1074790400B",
                "100%",
            ]
        );
    }

    #[test]
    fn offset_and_entry_sizes_resolve_against_device() {
        let device = Size::from_bytes(1000);
        assert_eq!(Offset::Percent(50).resolve(device), 500);
        assert_eq!(Offset::Bytes(42).resolve(device), 42);

        let entry = BoundaryEntry {
            start: Offset::Bytes(100),
            end: Offset::Percent(100),
        };
        assert_eq!(entry.size(device), Size::from_bytes(900));
    }
}
