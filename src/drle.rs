//! Delta run-length pattern engine.
//!
//! For every iteration order it is allowed to try, the engine run-length
//! encodes the successive column deltas of unpatterned elements, keeps the
//! deltas that carry enough of the partition's nonzeros, picks the most
//! profitable order and rewrites its rows, replacing runs by pattern
//! descriptors. The loop repeats until no order qualifies.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EncodingOptions;
use crate::elems::{ix, us, CsxIndex, CsxValue, DeltaRle, Elem, ElemKind};
use crate::order::{IterOrder, XFORM_MAX};
use crate::partition::{Builder, SparsePartition};

/// Accumulated weight of one delta value under one iteration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaStats {
    pub nnz: usize,
    pub npatterns: usize,
}

/// Per-delta statistics for one iteration order.
pub type Stats = BTreeMap<usize, DeltaStats>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rle {
    val: usize,
    freq: usize,
}

/// Run-length encode the successive deltas of `xs`. The first delta is the
/// first value itself, so a run starting at column 1 folds into the run of
/// its deltas.
fn rle_encode_deltas(xs: &[usize]) -> Vec<Rle> {
    let mut out: Vec<Rle> = Vec::new();
    let mut prev = 0;
    for &x in xs {
        let delta = x - prev;
        prev = x;
        match out.last_mut() {
            Some(last) if last.val == delta => last.freq += 1,
            _ => out.push(Rle {
                val: delta,
                freq: 1,
            }),
        }
    }
    out
}

/// Statistics gathering and row rewriting over one partition.
pub struct DrleManager<'a, I, V> {
    sp: &'a mut SparsePartition<I, V>,
    min_limit: usize,
    max_limit: usize,
    min_perc: f64,
    window_size: usize,
    samples_max: usize,
    sampling_prob: f64,
    split_blocks: bool,
    xforms_ignore: [bool; XFORM_MAX],
    stats: BTreeMap<IterOrder, Stats>,
    deltas_to_encode: BTreeMap<IterOrder, BTreeSet<usize>>,
}

impl<'a, I: CsxIndex, V: CsxValue> DrleManager<'a, I, V> {
    pub fn new(sp: &'a mut SparsePartition<I, V>, opts: &EncodingOptions) -> Self {
        let mut mgr = DrleManager {
            sp,
            min_limit: opts.min_limit,
            max_limit: opts.max_limit,
            min_perc: opts.min_perc,
            window_size: opts.window_size,
            samples_max: opts.samples_max,
            sampling_prob: opts.sampling_prob,
            split_blocks: opts.split_blocks,
            xforms_ignore: [true; XFORM_MAX],
            stats: BTreeMap::new(),
            deltas_to_encode: BTreeMap::new(),
        };
        for &t in &opts.xforms {
            mgr.remove_ignore(t);
        }
        mgr
    }

    pub fn ignore_all(&mut self) {
        self.xforms_ignore = [true; XFORM_MAX];
    }

    pub fn add_ignore(&mut self, t: IterOrder) {
        self.xforms_ignore[u8::from(t) as usize] = true;
    }

    pub fn remove_ignore(&mut self, t: IterOrder) {
        if t != IterOrder::None {
            self.xforms_ignore[u8::from(t) as usize] = false;
        }
    }

    fn ignored(&self, t: IterOrder) -> bool {
        self.xforms_ignore[u8::from(t) as usize]
    }

    /// Repeatedly gather statistics for every candidate order, encode the
    /// most profitable one and retire it, until none qualifies.
    pub fn encode_all(&mut self) {
        loop {
            self.gen_all_stats();
            self.log_stats();
            let t = self.choose_order();
            if t == IterOrder::None {
                break;
            }
            debug!("encoding {t}");
            self.encode(t);
        }
    }

    /// Encode the given per-order delta lists exactly, in order, without
    /// consulting statistics.
    pub fn encode_serial(&mut self, seq: &[(IterOrder, Vec<usize>)]) {
        for (t, deltas) in seq {
            self.deltas_to_encode
                .insert(*t, deltas.iter().copied().collect());
            self.encode(*t);
        }
    }

    /// Gather and filter statistics for every non-ignored order. The
    /// partition is returned to HORIZONTAL between orders.
    pub fn gen_all_stats(&mut self) {
        self.stats.clear();
        let total = self.sp.nr_nonzeros();
        for t in IterOrder::kinds() {
            if self.ignored(t) {
                continue;
            }
            self.sp.transform(t);
            let raw = if self.window_size > 0 {
                self.sampled_stats()
            } else {
                self.generate_stats()
            };
            self.sp.transform(IterOrder::Horizontal);

            let mut kept = Stats::new();
            for (delta, s) in raw {
                if total > 0 && s.nnz as f64 / total as f64 >= self.min_perc {
                    self.deltas_to_encode.entry(t).or_default().insert(delta);
                    kept.insert(delta, s);
                }
            }
            if !kept.is_empty() {
                self.stats.insert(t, kept);
            }
        }
    }

    /// The order whose kept deltas cover the most nonzeros; ties go to the
    /// smaller order id. `None` when nothing qualifies.
    pub fn choose_order(&self) -> IterOrder {
        let mut ret = IterOrder::None;
        let mut max_out = 0;
        for (t, stats) in &self.stats {
            let out: usize = stats.values().map(|s| s.nnz).sum();
            if out > max_out {
                max_out = out;
                ret = *t;
            }
        }
        ret
    }

    /// Rewrite the partition in order `t`, replacing eligible runs by
    /// pattern descriptors, then return it to HORIZONTAL and retire `t`.
    pub fn encode(&mut self, t: IterOrder) {
        if t == IterOrder::None {
            return;
        }
        let deltas = self.deltas_to_encode.get(&t).cloned().unwrap_or_default();

        if self.window_size > 0 && self.sp.logical_rows() > self.window_size {
            // Encode the full partition window by window, re-using the
            // decisions derived from the sampled statistics.
            let rows = self.sp.logical_rows();
            let mut rs = 0;
            while rs < rows {
                let len = self.window_size.min(rows - rs);
                let mut w = self.sp.extract_window(rs, len);
                w.transform(t);
                Self::encode_partition(
                    &mut w,
                    t,
                    &deltas,
                    self.min_limit,
                    self.max_limit,
                    self.split_blocks,
                );
                w.transform(IterOrder::Horizontal);
                self.sp.put_window(&w);
                rs += len;
            }
        } else {
            self.sp.transform(t);
            Self::encode_partition(
                &mut *self.sp,
                t,
                &deltas,
                self.min_limit,
                self.max_limit,
                self.split_blocks,
            );
            self.sp.transform(IterOrder::Horizontal);
        }
        self.add_ignore(t);
    }

    /// Statistics over the whole partition, which must already be in the
    /// target order.
    fn generate_stats(&self) -> Stats {
        let block_align = self.sp.order().block_align();
        let mut stats = Stats::new();
        let mut xs = Vec::new();
        for i in 0..self.sp.logical_rows() {
            self.row_stats(self.sp.row(i), &mut xs, &mut stats, block_align);
        }
        stats
    }

    /// Statistics over sampled row windows of the (already transformed)
    /// partition.
    fn sampled_stats(&self) -> Stats {
        let block_align = self.sp.order().block_align();
        let rows = self.sp.logical_rows();
        let nr_windows = rows.div_ceil(self.window_size);
        let mut stats = Stats::new();
        let mut xs = Vec::new();
        for wi in self.select_windows(nr_windows) {
            let w = self.sp.window(wi * self.window_size, self.window_size);
            for r in 0..w.logical_rows() {
                self.row_stats(w.row(r), &mut xs, &mut stats, block_align);
            }
        }
        stats
    }

    /// Which windows to sample: every window at stride when no sampling
    /// probability is set, otherwise a seeded Bernoulli draw capped at
    /// `samples_max`.
    fn select_windows(&self, nr_windows: usize) -> Vec<usize> {
        if self.samples_max == 0 {
            return Vec::new();
        }
        if self.sampling_prob == 0.0 {
            let stride = if self.samples_max >= nr_windows {
                1
            } else {
                (nr_windows / self.samples_max).max(1)
            };
            (0..nr_windows)
                .step_by(stride)
                .take(self.samples_max)
                .collect()
        } else {
            let seed = (us(self.sp.row_start()) as u64) << 32 ^ self.sp.nr_nonzeros() as u64;
            let mut rng = StdRng::seed_from_u64(seed);
            (0..nr_windows)
                .filter(|_| rng.gen_bool(self.sampling_prob))
                .take(self.samples_max)
                .collect()
        }
    }

    fn row_stats(
        &self,
        row: &[Elem<I, V>],
        xs: &mut Vec<usize>,
        stats: &mut Stats,
        block_align: usize,
    ) {
        for e in row {
            match e.kind {
                ElemKind::Scalar(_) => xs.push(us(e.col)),
                ElemKind::Patterned { .. } => self.update_stats(xs, stats, block_align),
            }
        }
        self.update_stats(xs, stats, block_align);
    }

    fn update_stats(&self, xs: &mut Vec<usize>, stats: &mut Stats, block_align: usize) {
        if block_align > 0 {
            self.update_stats_block(xs, stats, block_align);
            return;
        }
        if xs.is_empty() {
            return;
        }
        for rle in rle_encode_deltas(xs) {
            if rle.freq >= self.min_limit {
                let entry = stats.entry(rle.val).or_default();
                entry.nnz += rle.freq;
                entry.npatterns += 1;
            }
        }
        xs.clear();
    }

    fn update_stats_block(&self, xs: &mut Vec<usize>, stats: &mut Stats, block_align: usize) {
        if xs.is_empty() {
            return;
        }
        let mut unit_start = 0;
        for rle in rle_encode_deltas(xs) {
            unit_start += rle.val;
            if rle.val == 1 {
                // Unless the run opens the row, the element just before it
                // is part of the block candidate; then drop elements in
                // front of the first k-aligned column. Requiring two full
                // block rows keeps degenerate blocks out, and the encoder
                // applies the exact same arithmetic.
                let mut nr_elem = if unit_start == 1 {
                    rle.freq
                } else {
                    rle.freq + 1
                };
                let skip_front = if unit_start == 1 {
                    0
                } else {
                    (unit_start - 2) % block_align
                };
                nr_elem = nr_elem.saturating_sub(skip_front);
                if nr_elem / block_align >= 2 {
                    let entry = stats.entry(1).or_default();
                    entry.nnz += (nr_elem / block_align) * block_align;
                    entry.npatterns += 1;
                }
            }
            unit_start += rle.val * (rle.freq - 1);
        }
        xs.clear();
    }

    /// Rewrite every row of `sp` (already in order `t`).
    fn encode_partition(
        sp: &mut SparsePartition<I, V>,
        t: IterOrder,
        deltas: &BTreeSet<usize>,
        min_limit: usize,
        max_limit: usize,
        split_blocks: bool,
    ) {
        let rows = sp.logical_rows();
        let block_align = t.block_align();
        let mut bld = Builder::new(rows + 1, sp.elems_size());
        let mut newrow: Vec<Elem<I, V>> = Vec::new();
        let mut xs: Vec<usize> = Vec::new();
        let mut vs: Vec<V> = Vec::new();

        for i in 0..rows {
            for e in sp.row(i) {
                match &e.kind {
                    ElemKind::Scalar(v) => {
                        xs.push(us(e.col));
                        vs.push(*v);
                    }
                    ElemKind::Patterned { .. } => {
                        if !xs.is_empty() {
                            Self::do_encode(
                                &mut xs,
                                &mut vs,
                                t,
                                deltas,
                                min_limit,
                                max_limit,
                                split_blocks,
                                block_align,
                                &mut newrow,
                            );
                        }
                        newrow.push(e.clone());
                    }
                }
            }
            if !xs.is_empty() {
                Self::do_encode(
                    &mut xs,
                    &mut vs,
                    t,
                    deltas,
                    min_limit,
                    max_limit,
                    split_blocks,
                    block_align,
                    &mut newrow,
                );
            }
            for e in newrow.drain(..) {
                bld.push_elem(e);
            }
            bld.new_row(1);
        }

        bld.install(sp);
    }

    /// Encode one gathered run of scalar columns/values into `newrow`.
    #[allow(clippy::too_many_arguments)]
    fn do_encode(
        xs: &mut Vec<usize>,
        vs: &mut Vec<V>,
        t: IterOrder,
        deltas: &BTreeSet<usize>,
        min_limit: usize,
        max_limit: usize,
        split_blocks: bool,
        block_align: usize,
        newrow: &mut Vec<Elem<I, V>>,
    ) {
        if block_align > 0 {
            Self::do_encode_block(xs, vs, t, deltas, max_limit, split_blocks, block_align, newrow);
            return;
        }

        let mut vi = 0;
        let mut col = 0;
        for rle in rle_encode_deltas(xs) {
            let mut freq = rle.freq;
            if deltas.contains(&rle.val) && freq >= min_limit {
                // Long runs split at max_limit; the sub-min_limit tail
                // becomes a descriptor only under split-blocks, scalars
                // otherwise.
                while freq >= min_limit || (split_blocks && freq > 0) {
                    let f = freq.min(max_limit);
                    col += rle.val;
                    let vals: Box<[V]> = vs[vi..vi + f].to_vec().into();
                    newrow.push(Elem::patterned(ix(col), DeltaRle::new(f, rle.val, t), vals));
                    vi += f;
                    col += rle.val * (f - 1);
                    freq -= f;
                }
            }
            for _ in 0..freq {
                col += rle.val;
                newrow.push(Elem::scalar(ix(col), vs[vi]));
                vi += 1;
            }
        }

        debug_assert_eq!(vi, vs.len());
        xs.clear();
        vs.clear();
    }

    /// Block-kind variant: only consecutive-column runs qualify, aligned
    /// down to whole blocks of `block_align` logical rows.
    #[allow(clippy::too_many_arguments)]
    fn do_encode_block(
        xs: &mut Vec<usize>,
        vs: &mut Vec<V>,
        t: IterOrder,
        deltas: &BTreeSet<usize>,
        max_limit: usize,
        split_blocks: bool,
        block_align: usize,
        newrow: &mut Vec<Elem<I, V>>,
    ) {
        let mut vi = 0;
        let mut col = 0;
        for rle in rle_encode_deltas(xs) {
            col += rle.val;
            let (skip_front, raw_elems) = if col == 1 {
                (0, rle.freq)
            } else {
                ((col - 2) % block_align, rle.freq + 1)
            };
            let mut nr_elem = raw_elems.saturating_sub(skip_front);
            let mut skip_back = nr_elem % block_align;
            nr_elem -= skip_back;

            if rle.val == 1 && deltas.contains(&1) && nr_elem >= 2 * block_align {
                let rle_start = if col == 1 {
                    col
                } else {
                    // Annex the element just before the run.
                    newrow.pop();
                    vi -= 1;
                    col - 1
                };

                for i in 0..skip_front {
                    newrow.push(Elem::scalar(ix(rle_start + i), vs[vi]));
                    vi += 1;
                }

                let max_aligned = (max_limit / (2 * block_align)) * (2 * block_align);
                let nr_elem_block = nr_elem.min(max_aligned);
                let nr_blocks = if split_blocks {
                    (nr_elem / max_aligned).max(1)
                } else {
                    1
                };
                skip_back += nr_elem - nr_elem_block * nr_blocks;

                for b in 0..nr_blocks {
                    let start = rle_start + skip_front + b * nr_elem_block;
                    let vals: Box<[V]> = vs[vi..vi + nr_elem_block].to_vec().into();
                    newrow.push(Elem::patterned(
                        ix(start),
                        DeltaRle::new(nr_elem_block, 1, t),
                        vals,
                    ));
                    vi += nr_elem_block;
                }

                let tail_start = rle_start + skip_front + nr_blocks * nr_elem_block;
                for i in 0..skip_back {
                    newrow.push(Elem::scalar(ix(tail_start + i), vs[vi]));
                    vi += 1;
                }
            } else {
                for i in 0..rle.freq {
                    newrow.push(Elem::scalar(ix(col + i * rle.val), vs[vi]));
                    vi += 1;
                }
            }

            col += rle.val * (rle.freq - 1);
        }

        debug_assert_eq!(vi, vs.len());
        xs.clear();
        vs.clear();
    }

    fn log_stats(&self) {
        if self.stats.is_empty() {
            return;
        }
        let total = self.sp.nr_nonzeros().max(1);
        for (t, stats) in &self.stats {
            let line: Vec<String> = stats
                .iter()
                .map(|(delta, s)| {
                    format!(
                        "{delta}-> np:{} nnz:{:.1}% ({})",
                        s.npatterns,
                        100.0 * s.nnz as f64 / total as f64,
                        s.nnz
                    )
                })
                .collect();
            debug!("{t}\t{}", line.join(" "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elems::CooElem;

    type Part = SparsePartition<i64, f64>;

    fn build(nr_rows: i64, nr_cols: i64, points: &[(i64, i64)]) -> Part {
        let coo: Vec<CooElem<i64, f64>> = points
            .iter()
            .enumerate()
            .map(|(i, &(r, c))| CooElem::new(r, c, i as f64 + 1.0))
            .collect();
        let mut sp = Part::new(nr_rows, nr_cols);
        let n = sp.set_elems(coo, 1, points.len(), nr_rows as usize + 1);
        sp.set_nr_nonzeros(n);
        sp.pad_rows(nr_rows as usize);
        sp
    }

    fn opts_for(kinds: &[IterOrder]) -> EncodingOptions {
        EncodingOptions {
            xforms: kinds.to_vec(),
            ..EncodingOptions::default()
        }
    }

    fn patterns_of(sp: &Part) -> Vec<(i64, i64, DeltaRle)> {
        sp.points()
            .filter_map(|(r, e)| e.pattern().map(|p| (r, e.col, *p)))
            .collect()
    }

    fn scalars_of(sp: &Part) -> Vec<(i64, i64)> {
        sp.points()
            .filter(|(_, e)| e.pattern().is_none())
            .map(|(r, e)| (r, e.col))
            .collect()
    }

    #[test]
    fn delta_rle_folds_the_leading_column() {
        let rles = rle_encode_deltas(&[1, 2, 3, 4, 5]);
        assert_eq!(
            rles,
            vec![Rle { val: 1, freq: 5 }]
        );
        let rles = rle_encode_deltas(&[3, 4, 5, 6, 7]);
        assert_eq!(
            rles,
            vec![Rle { val: 3, freq: 1 }, Rle { val: 1, freq: 4 }]
        );
    }

    #[test]
    fn plain_horizontal_run_becomes_one_pattern() {
        // (1,1)..(1,5) in a 1x5 matrix.
        let mut sp = build(1, 5, &[(1, 1), (1, 2), (1, 3), (1, 4), (1, 5)]);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::Horizontal]));
        mgr.encode_all();
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 1, DeltaRle::new(5, 1, IterOrder::Horizontal))]
        );
        assert!(scalars_of(&sp).is_empty());
    }

    #[test]
    fn vertical_run_is_found_through_the_transpose() {
        let mut sp = build(5, 3, &[(1, 3), (2, 3), (3, 3), (4, 3), (5, 3)]);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::Vertical]));
        mgr.gen_all_stats();
        assert_eq!(mgr.choose_order(), IterOrder::Vertical);
        mgr.encode_all();
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 3, DeltaRle::new(5, 1, IterOrder::Vertical))]
        );
    }

    #[test]
    fn aligned_block_is_encoded_with_a_scalar_leftover() {
        let mut sp = build(3, 3, &[(1, 1), (1, 2), (2, 1), (2, 2), (3, 3)]);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::BlockRow2]));
        mgr.encode_all();
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 1, DeltaRle::new(4, 1, IterOrder::BlockRow2))]
        );
        assert_eq!(scalars_of(&sp), vec![(3, 3)]);
    }

    #[test]
    fn diagonal_run_is_found() {
        let mut sp = build(5, 5, &[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::Diagonal]));
        mgr.encode_all();
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 1, DeltaRle::new(5, 1, IterOrder::Diagonal))]
        );
    }

    #[test]
    fn the_densest_order_wins_and_short_leftovers_stay_scalar() {
        // A 5-element diagonal and a 3-element horizontal tail in row 1.
        let pts = [
            (1, 1),
            (1, 2),
            (1, 3),
            (1, 4),
            (2, 2),
            (3, 3),
            (4, 4),
            (5, 5),
        ];
        let mut sp = build(6, 6, &pts);
        let mut mgr = DrleManager::new(
            &mut sp,
            &opts_for(&[IterOrder::Horizontal, IterOrder::Diagonal]),
        );
        mgr.gen_all_stats();
        assert_eq!(mgr.choose_order(), IterOrder::Diagonal);
        mgr.encode_all();
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 1, DeltaRle::new(5, 1, IterOrder::Diagonal))]
        );
        // The horizontal remainder dropped below min_limit.
        assert_eq!(scalars_of(&sp), vec![(1, 2), (1, 3), (1, 4)]);
    }

    #[test]
    fn run_at_max_limit_is_one_descriptor() {
        let pts: Vec<(i64, i64)> = (1..=254).map(|c| (1, c)).collect();
        let mut sp = build(1, 300, &pts);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::Horizontal]));
        mgr.encode_all();
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 1, DeltaRle::new(254, 1, IterOrder::Horizontal))]
        );
    }

    #[test]
    fn run_past_max_limit_splits_or_leaves_a_scalar() {
        let pts: Vec<(i64, i64)> = (1..=255).map(|c| (1, c)).collect();

        let mut split = build(1, 300, &pts);
        let mut opts = opts_for(&[IterOrder::Horizontal]);
        opts.split_blocks = true;
        DrleManager::new(&mut split, &opts).encode_all();
        assert_eq!(
            patterns_of(&split),
            vec![
                (1, 1, DeltaRle::new(254, 1, IterOrder::Horizontal)),
                (1, 255, DeltaRle::new(1, 1, IterOrder::Horizontal)),
            ]
        );

        let mut nosplit = build(1, 300, &pts);
        opts.split_blocks = false;
        DrleManager::new(&mut nosplit, &opts).encode_all();
        assert_eq!(
            patterns_of(&nosplit),
            vec![(1, 1, DeltaRle::new(254, 1, IterOrder::Horizontal))]
        );
        assert_eq!(scalars_of(&nosplit), vec![(1, 255)]);
    }

    #[test]
    fn block_runs_annex_their_predecessor_and_stay_aligned() {
        // Columns 2..=9 of rows 1 and 2: in block coordinates the run
        // starts one past its first element, which the encoder annexes
        // back before aligning.
        let mut pts = Vec::new();
        for r in 1..=2i64 {
            for c in 2..=9i64 {
                pts.push((r, c));
            }
        }
        let mut sp = build(2, 9, &pts);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::BlockRow2]));
        mgr.encode_all();
        drop(mgr);

        let pats = patterns_of(&sp);
        assert!(!pats.is_empty());
        for (_, col, pat) in pats {
            assert_eq!(pat.kind, IterOrder::BlockRow2);
            assert_eq!(pat.delta, 1);
            // Block starts on an alignment boundary and covers whole
            // blocks, in block coordinates.
            assert_eq!((col - 1) % 2, 0);
            assert_eq!(pat.size % 2, 0);
        }
        let total: usize = sp.points().map(|(_, e)| e.nr_values()).sum();
        assert_eq!(total, pts.len());
    }

    #[test]
    fn patterns_in_a_row_never_overlap() {
        let pts = [
            (1, 1),
            (1, 2),
            (1, 3),
            (1, 4),
            (1, 6),
            (1, 8),
            (1, 10),
            (1, 12),
        ];
        let mut sp = build(1, 12, &pts);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::Horizontal]));
        mgr.encode_all();
        drop(mgr);

        let mut covered = std::collections::BTreeSet::new();
        for (_, e) in sp.points() {
            match e.pattern() {
                Some(p) => {
                    for c in p.generator(e.col) {
                        assert!(covered.insert(c), "column {c} covered twice");
                    }
                }
                None => {
                    assert!(covered.insert(e.col));
                }
            }
        }
        assert_eq!(covered.len(), pts.len());
    }

    #[test]
    fn serial_encoding_bypasses_statistics() {
        // The explicit delta list selects delta-2 runs without any
        // statistics pass.
        let pts = [(1, 2), (1, 4), (1, 6), (1, 8), (2, 1)];
        let mut sp = build(2, 8, &pts);
        let mut mgr = DrleManager::new(&mut sp, &opts_for(&[IterOrder::Horizontal]));
        mgr.encode_serial(&[(IterOrder::Horizontal, vec![2])]);
        drop(mgr);

        assert_eq!(
            patterns_of(&sp),
            vec![(1, 2, DeltaRle::new(4, 2, IterOrder::Horizontal))]
        );
        assert_eq!(scalars_of(&sp), vec![(2, 1)]);
    }

    #[test]
    fn windowed_encoding_matches_the_unwindowed_result() {
        let mut pts = Vec::new();
        for r in 1..=12i64 {
            for c in 1..=6i64 {
                pts.push((r, c));
            }
        }
        let mut whole = build(12, 6, &pts);
        let mut windowed = build(12, 6, &pts);

        let opts = opts_for(&[IterOrder::Horizontal]);
        DrleManager::new(&mut whole, &opts).encode_all();

        let wopts = EncodingOptions {
            window_size: 4,
            ..opts
        };
        DrleManager::new(&mut windowed, &wopts).encode_all();

        assert_eq!(patterns_of(&whole), patterns_of(&windowed));
        assert_eq!(scalars_of(&whole), scalars_of(&windowed));
    }

    #[test]
    fn empty_partition_encodes_to_nothing() {
        let mut sp = Part::new(4, 4);
        sp.pad_rows(4);
        let mut mgr = DrleManager::new(&mut sp, &EncodingOptions::default());
        mgr.encode_all();
        drop(mgr);
        assert_eq!(sp.elems_size(), 0);
    }
}
