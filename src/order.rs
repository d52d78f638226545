use std::fmt::{self, Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Iteration orders understood by the encoding engine.
///
/// Each order defines a coordinate system in which the matrix can be walked
/// row-major; the pattern engine looks for constant-delta runs in every
/// order it is allowed to try. The discriminants are stable and are the ids
/// accepted by `XFORM_CONF`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum IterOrder {
    None = 0,
    Horizontal = 1,
    Vertical = 2,
    Diagonal = 3,
    RevDiagonal = 4,
    BlockRow1 = 5,
    BlockRow2 = 6,
    BlockRow3 = 7,
    BlockRow4 = 8,
    BlockRow5 = 9,
    BlockRow6 = 10,
    BlockRow7 = 11,
    BlockRow8 = 12,
    BlockCol1 = 13,
    BlockCol2 = 14,
    BlockCol3 = 15,
    BlockCol4 = 16,
    BlockCol5 = 17,
    BlockCol6 = 18,
    BlockCol7 = 19,
    BlockCol8 = 20,
}

/// Number of `IterOrder` values, including the `None` sentinel.
pub const XFORM_MAX: usize = 21;

impl IterOrder {
    /// All non-sentinel orders, in id order.
    pub fn kinds() -> impl Iterator<Item = IterOrder> {
        (1..XFORM_MAX as u8).map(|id| IterOrder::try_from(id).unwrap())
    }

    /// The orders the pattern engine considers by default: everything
    /// except the degenerate one-row/one-column block variants.
    pub fn encodable() -> impl Iterator<Item = IterOrder> {
        Self::kinds().filter(|t| !matches!(t, IterOrder::BlockRow1 | IterOrder::BlockCol1))
    }

    /// Block height (for row blocks) or width (for column blocks);
    /// zero for the non-block orders.
    pub fn block_align(self) -> usize {
        let id = u8::from(self) as usize;
        match self {
            t if t.is_row_block() => id - u8::from(IterOrder::BlockRow1) as usize + 1,
            t if t.is_col_block() => id - u8::from(IterOrder::BlockCol1) as usize + 1,
            _ => 0,
        }
    }

    pub fn is_row_block(self) -> bool {
        (IterOrder::BlockRow1..=IterOrder::BlockRow8).contains(&self)
    }

    pub fn is_col_block(self) -> bool {
        (IterOrder::BlockCol1..=IterOrder::BlockCol8).contains(&self)
    }

    pub fn is_block(self) -> bool {
        self.is_row_block() || self.is_col_block()
    }

    /// Orders whose logical rows are (groups of) matrix rows.
    pub(crate) fn in_row_family(self) -> bool {
        self == IterOrder::Horizontal || self.is_row_block()
    }

    /// Orders whose logical rows are (groups of) matrix columns.
    pub(crate) fn in_col_family(self) -> bool {
        self == IterOrder::Vertical || self.is_col_block()
    }

    pub fn name(self) -> &'static str {
        match self {
            IterOrder::None => "NONE",
            IterOrder::Horizontal => "HORIZONTAL",
            IterOrder::Vertical => "VERTICAL",
            IterOrder::Diagonal => "DIAGONAL",
            IterOrder::RevDiagonal => "REV_DIAGONAL",
            IterOrder::BlockRow1 => "BLOCK_ROW_1",
            IterOrder::BlockRow2 => "BLOCK_ROW_2",
            IterOrder::BlockRow3 => "BLOCK_ROW_3",
            IterOrder::BlockRow4 => "BLOCK_ROW_4",
            IterOrder::BlockRow5 => "BLOCK_ROW_5",
            IterOrder::BlockRow6 => "BLOCK_ROW_6",
            IterOrder::BlockRow7 => "BLOCK_ROW_7",
            IterOrder::BlockRow8 => "BLOCK_ROW_8",
            IterOrder::BlockCol1 => "BLOCK_COL_1",
            IterOrder::BlockCol2 => "BLOCK_COL_2",
            IterOrder::BlockCol3 => "BLOCK_COL_3",
            IterOrder::BlockCol4 => "BLOCK_COL_4",
            IterOrder::BlockCol5 => "BLOCK_COL_5",
            IterOrder::BlockCol6 => "BLOCK_COL_6",
            IterOrder::BlockCol7 => "BLOCK_COL_7",
            IterOrder::BlockCol8 => "BLOCK_COL_8",
        }
    }
}

impl Display for IterOrder {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for id in 0..XFORM_MAX as u8 {
            let t = IterOrder::try_from(id).unwrap();
            assert_eq!(u8::from(t), id);
        }
        assert!(IterOrder::try_from(XFORM_MAX as u8).is_err());
    }

    #[test]
    fn block_alignment() {
        assert_eq!(IterOrder::Horizontal.block_align(), 0);
        assert_eq!(IterOrder::Diagonal.block_align(), 0);
        assert_eq!(IterOrder::BlockRow1.block_align(), 1);
        assert_eq!(IterOrder::BlockRow4.block_align(), 4);
        assert_eq!(IterOrder::BlockCol2.block_align(), 2);
        assert_eq!(IterOrder::BlockCol8.block_align(), 8);
    }

    #[test]
    fn families() {
        assert!(IterOrder::Horizontal.in_row_family());
        assert!(IterOrder::BlockRow3.in_row_family());
        assert!(!IterOrder::Vertical.in_row_family());
        assert!(IterOrder::BlockCol5.in_col_family());
        assert!(!IterOrder::Diagonal.in_col_family());
    }

    #[test]
    fn encodable_skips_degenerate_blocks() {
        let kinds: Vec<_> = IterOrder::encodable().collect();
        assert_eq!(kinds.len(), 18);
        assert!(!kinds.contains(&IterOrder::BlockRow1));
        assert!(!kinds.contains(&IterOrder::BlockCol1));
    }
}
