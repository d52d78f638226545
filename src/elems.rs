use std::fmt::{Debug, Display};

use num::{FromPrimitive, PrimInt, ToPrimitive};

use crate::order::IterOrder;

/// Index types usable for row/column coordinates. Coordinates are one-based
/// throughout the engine; callers guarantee `row, col <= nr_rows + nr_cols`,
/// so both signed and unsigned integers work.
pub trait CsxIndex:
    PrimInt + FromPrimitive + ToPrimitive + Debug + Display + Default + Send + Sync + 'static
{
}

impl<T> CsxIndex for T where
    T: PrimInt + FromPrimitive + ToPrimitive + Debug + Display + Default + Send + Sync + 'static
{
}

/// Value types carried by matrix elements. Values are only stored and
/// moved, never computed with, so `Copy + PartialEq` suffices.
pub trait CsxValue: Copy + Default + PartialEq + Debug + Send + Sync + 'static {}

impl<T> CsxValue for T where T: Copy + Default + PartialEq + Debug + Send + Sync + 'static {}

pub(crate) fn ix<I: CsxIndex>(v: usize) -> I {
    I::from_usize(v).expect("coordinate does not fit the index type")
}

pub(crate) fn us<I: CsxIndex>(v: I) -> usize {
    v.to_usize().expect("negative coordinate")
}

/// A single nonzero in coordinate form, one-based.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CooElem<I, V> {
    pub row: I,
    pub col: I,
    pub val: V,
}

impl<I, V> CooElem<I, V> {
    pub fn new(row: I, col: I, val: V) -> Self {
        CooElem { row, col, val }
    }
}

/// A run-length pattern descriptor: `size` elements spaced `delta` apart
/// in `kind`'s coordinate system, starting at the carrying element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeltaRle {
    pub size: u32,
    pub delta: u32,
    pub kind: IterOrder,
}

impl DeltaRle {
    pub fn new(size: usize, delta: usize, kind: IterOrder) -> Self {
        DeltaRle {
            size: size as u32,
            delta: delta as u32,
            kind,
        }
    }

    /// The column coordinates covered by the pattern, in its own order's
    /// coordinate system, given the column of the carrying element.
    pub fn generator<I: CsxIndex>(&self, start_col: I) -> impl Iterator<Item = I> {
        let delta = self.delta as usize;
        (0..self.size as usize).map(move |i| start_col + ix(i * delta))
    }
}

/// Body of a stored element: either a plain scalar or a pattern descriptor
/// owning the values of every element it covers, in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum ElemKind<V> {
    Scalar(V),
    Patterned { pattern: DeltaRle, vals: Box<[V]> },
}

/// One stored element of a partition row. The element's logical row is
/// implicit in the partition's row-pointer array.
#[derive(Clone, Debug, PartialEq)]
pub struct Elem<I, V> {
    pub col: I,
    pub kind: ElemKind<V>,
}

impl<I: CsxIndex, V: CsxValue> Elem<I, V> {
    pub fn scalar(col: I, val: V) -> Self {
        Elem {
            col,
            kind: ElemKind::Scalar(val),
        }
    }

    pub fn patterned(col: I, pattern: DeltaRle, vals: Box<[V]>) -> Self {
        debug_assert_eq!(pattern.size as usize, vals.len());
        Elem {
            col,
            kind: ElemKind::Patterned { pattern, vals },
        }
    }

    pub fn pattern(&self) -> Option<&DeltaRle> {
        match &self.kind {
            ElemKind::Scalar(_) => None,
            ElemKind::Patterned { pattern, .. } => Some(pattern),
        }
    }

    /// Number of matrix nonzeros this element stands for.
    pub fn nr_values(&self) -> usize {
        match &self.kind {
            ElemKind::Scalar(_) => 1,
            ElemKind::Patterned { pattern, .. } => pattern.size as usize,
        }
    }
}

/// A row-qualified element, the item type accepted by the partition
/// builder. Plain coordinates and already-patterned elements both flow
/// through the same stream.
pub trait RowElement<I, V> {
    fn row(&self) -> I;
    fn into_elem(self) -> Elem<I, V>;
}

impl<I: CsxIndex, V: CsxValue> RowElement<I, V> for CooElem<I, V> {
    fn row(&self) -> I {
        self.row
    }

    fn into_elem(self) -> Elem<I, V> {
        Elem::scalar(self.col, self.val)
    }
}

/// Internal stream item used when rebuilding a partition from transformed
/// or re-encoded elements.
#[derive(Clone, Debug)]
pub(crate) struct RowElem<I, V> {
    pub row: I,
    pub elem: Elem<I, V>,
}

impl<I: CsxIndex, V: CsxValue> RowElement<I, V> for RowElem<I, V> {
    fn row(&self) -> I {
        self.row
    }

    fn into_elem(self) -> Elem<I, V> {
        self.elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_walks_the_pattern() {
        let pat = DeltaRle::new(4, 3, IterOrder::Horizontal);
        let cols: Vec<u32> = pat.generator(5u32).collect();
        assert_eq!(cols, vec![5, 8, 11, 14]);
    }

    #[test]
    fn scalar_element_has_no_pattern() {
        let e: Elem<u32, f64> = Elem::scalar(7, 1.5);
        assert!(e.pattern().is_none());
        assert_eq!(e.nr_values(), 1);
    }

    #[test]
    fn patterned_element_counts_its_values() {
        let pat = DeltaRle::new(3, 1, IterOrder::Vertical);
        let e: Elem<u32, f64> = Elem::patterned(2, pat, vec![1.0, 2.0, 3.0].into());
        assert_eq!(e.pattern(), Some(&pat));
        assert_eq!(e.nr_values(), 3);
    }
}
