//! Per-worker partitioning and the parallel preprocessing orchestrator.
//!
//! A sorted coordinate stream is split into one partition per worker at
//! row boundaries, targeting approximately equal nonzero counts. Each
//! worker then runs the pattern engine and the serializer independently;
//! a single-threaded fusion step collects the per-worker blobs.

use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::config::{EncodingOptions, RuntimeConfig};
use crate::drle::DrleManager;
use crate::elems::{ix, us, CooElem, CsxIndex, CsxValue};
use crate::matrix::CsxMatrix;
use crate::partition::SparsePartition;
use crate::symmetric::SparsePartitionSym;

/// One worker's share of the fused matrix.
#[derive(Clone, Debug)]
pub struct ThreadMatrix<I, V> {
    pub cpu: usize,
    pub matrix: CsxMatrix<I, V>,
}

/// The fused multi-threaded matrix: one CSX blob per worker, tagged with
/// the CPU the SpMV phase will pin the worker to.
#[derive(Clone, Debug)]
pub struct MtMatrix<I, V> {
    pub threads: Vec<ThreadMatrix<I, V>>,
}

impl<I: CsxIndex, V: CsxValue> MtMatrix<I, V> {
    pub fn nr_threads(&self) -> usize {
        self.threads.len()
    }

    /// Bytes of the compressed representation: values plus `ctl` streams.
    pub fn size(&self) -> usize {
        self.threads
            .iter()
            .map(|t| t.matrix.nr_nzeros * std::mem::size_of::<V>() + t.matrix.ctl_size())
            .sum()
    }

    /// All encoded triples in global one-based coordinates.
    pub fn points(&self) -> impl Iterator<Item = CooElem<I, V>> + '_ {
        self.threads.iter().flat_map(|t| {
            let row_start = t.matrix.row_start;
            t.matrix
                .points()
                .map(move |p| CooElem::new(p.row + row_start, p.col, p.val))
        })
    }
}

/// Symmetric counterpart: per worker, the diagonal values plus the
/// encoded remote (`m1`) and local (`m2`) halves of the lower triangle.
#[derive(Clone, Debug)]
pub struct ThreadMatrixSym<I, V> {
    pub cpu: usize,
    pub diagonal: Box<[V]>,
    pub m1: CsxMatrix<I, V>,
    pub m2: CsxMatrix<I, V>,
}

#[derive(Clone, Debug)]
pub struct MtMatrixSym<I, V> {
    pub threads: Vec<ThreadMatrixSym<I, V>>,
}

impl<I: CsxIndex, V: CsxValue> MtMatrixSym<I, V> {
    pub fn nr_threads(&self) -> usize {
        self.threads.len()
    }

    pub fn size(&self) -> usize {
        self.threads
            .iter()
            .map(|t| {
                (t.m1.nr_nzeros + t.m2.nr_nzeros + t.diagonal.len())
                    * std::mem::size_of::<V>()
                    + t.m1.ctl_size()
                    + t.m2.ctl_size()
            })
            .sum()
    }

    /// All encoded triples of the lower triangle plus the diagonal, in
    /// global one-based coordinates.
    pub fn points(&self) -> impl Iterator<Item = CooElem<I, V>> + '_ {
        self.threads.iter().flat_map(|t| {
            let row_start = t.m1.row_start;
            let diag = t
                .diagonal
                .iter()
                .enumerate()
                .map(move |(i, &v)| {
                    let rc = row_start + ix(i + 1);
                    CooElem::new(rc, rc, v)
                });
            let halves = t.m1.points().chain(t.m2.points());
            diag.chain(halves.map(move |p| CooElem::new(p.row + row_start, p.col, p.val)))
        })
    }
}

/// Split a sorted coordinate stream into `nr_parts` partitions at row
/// boundaries, targeting equal nonzero counts.
pub fn partition_stream<I, V, It>(
    iter: It,
    nr_rows: I,
    nr_cols: I,
    nr_nzeros: usize,
    nr_parts: usize,
) -> Vec<SparsePartition<I, V>>
where
    I: CsxIndex,
    V: CsxValue,
    It: IntoIterator<Item = CooElem<I, V>>,
{
    assert!(nr_parts > 0, "at least one partition is required");
    let mut iter = iter.into_iter().peekable();
    let mut parts = Vec::with_capacity(nr_parts);
    let mut row_start = 0;
    let mut cnt = 0;

    for i in 0..nr_parts {
        // The last partition runs without a limit so the stream drains
        // even when the caller's nonzero count was an estimate.
        let limit = if i == nr_parts - 1 {
            0
        } else {
            nr_nzeros.saturating_sub(cnt) / (nr_parts - i)
        };
        let mut sp = SparsePartition::new(I::zero(), nr_cols);
        let n = sp.set_elems_from(
            &mut iter,
            ix(row_start + 1),
            limit,
            limit,
            us(nr_rows) / nr_parts + 1,
        );
        let mut local_rows = sp.logical_rows();
        if i == nr_parts - 1 {
            // The last partition absorbs the trailing empty rows.
            local_rows = us(nr_rows) - row_start;
            sp.pad_rows(local_rows);
        }
        sp.set_nr_rows(ix(local_rows));
        sp.set_row_start(ix(row_start));
        sp.set_nr_nonzeros(n);
        row_start += local_rows;
        cnt += n;
        parts.push(sp);
    }

    parts
}

/// Symmetric variant: upper-triangle elements are dropped, the diagonal
/// goes to a dense per-partition vector. `nr_nzeros` is the expected
/// lower-triangle-plus-diagonal count used to balance the split.
pub fn partition_stream_sym<I, V, It>(
    iter: It,
    nr_rows: I,
    nr_cols: I,
    nr_nzeros: usize,
    nr_parts: usize,
) -> Vec<SparsePartitionSym<I, V>>
where
    I: CsxIndex,
    V: CsxValue,
    It: IntoIterator<Item = CooElem<I, V>>,
{
    assert!(nr_parts > 0, "at least one partition is required");
    assert_eq!(nr_rows, nr_cols, "symmetric matrices are square");
    let mut iter = iter.into_iter().peekable();
    let mut parts = Vec::with_capacity(nr_parts);
    let mut row_start = 0;
    let mut cnt = 0;

    for i in 0..nr_parts {
        let limit = if i == nr_parts - 1 {
            0
        } else {
            nr_nzeros.saturating_sub(cnt) / (nr_parts - i)
        };
        let mut sym = SparsePartitionSym::new(I::zero(), nr_cols);
        let n = sym.set_elems_from(
            &mut iter,
            ix(row_start + 1),
            limit,
            limit,
            us(nr_rows) / nr_parts + 1,
        );
        sym.finish_load(ix(row_start));
        let mut local_rows = us(sym.lower().nr_rows());
        if i == nr_parts - 1 {
            local_rows = us(nr_rows) - row_start;
            sym.finish_rows(local_rows);
        }
        row_start += local_rows;
        cnt += n;
        parts.push(sym);
    }

    parts
}

/// Run the full preprocessing pipeline, one worker per partition, and
/// fuse the results. Workers share nothing; the only synchronization is
/// the final join.
pub fn build_mt<I, V>(
    partitions: Vec<SparsePartition<I, V>>,
    opts: &EncodingOptions,
    rt: &RuntimeConfig,
) -> MtMatrix<I, V>
where
    I: CsxIndex,
    V: CsxValue,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(rt.nr_threads())
        .build()
        .expect("failed to build the worker pool");
    let serial = opts.serial_deltas();
    let started = Instant::now();

    let blobs: Vec<CsxMatrix<I, V>> = pool.install(|| {
        partitions
            .into_par_iter()
            .map(|mut sp| {
                let mut mgr = DrleManager::new(&mut sp, opts);
                match &serial {
                    Some(seq) => mgr.encode_serial(seq),
                    None => mgr.encode_all(),
                }
                drop(mgr);
                CsxMatrix::from_partition(&sp, opts.full_colind, opts.ucol_size)
            })
            .collect()
    });

    info!(
        "preprocessing finished in {:.3} s",
        started.elapsed().as_secs_f64()
    );
    MtMatrix {
        threads: blobs
            .into_iter()
            .enumerate()
            .map(|(i, matrix)| ThreadMatrix {
                cpu: rt.cpus[i % rt.cpus.len()],
                matrix,
            })
            .collect(),
    }
}

/// Symmetric pipeline: split each partition, encode the two halves
/// independently, serialize both.
pub fn build_mt_sym<I, V>(
    partitions: Vec<SparsePartitionSym<I, V>>,
    opts: &EncodingOptions,
    rt: &RuntimeConfig,
) -> MtMatrixSym<I, V>
where
    I: CsxIndex,
    V: CsxValue,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(rt.nr_threads())
        .build()
        .expect("failed to build the worker pool");
    let serial = opts.serial_deltas();
    let started = Instant::now();

    let blobs: Vec<(Box<[V]>, CsxMatrix<I, V>, CsxMatrix<I, V>)> = pool.install(|| {
        partitions
            .into_par_iter()
            .map(|mut sym| {
                sym.divide_matrix();
                for half in 0..2 {
                    let (m1, m2) = sym.halves_mut();
                    let target = if half == 0 { m1 } else { m2 };
                    let mut mgr = DrleManager::new(target, opts);
                    match &serial {
                        Some(seq) => mgr.encode_serial(seq),
                        None => mgr.encode_all(),
                    }
                }
                sym.mark_encoded();
                let m1 = CsxMatrix::from_partition(
                    sym.m1().unwrap(),
                    opts.full_colind,
                    opts.ucol_size,
                );
                let m2 = CsxMatrix::from_partition(
                    sym.m2().unwrap(),
                    opts.full_colind,
                    opts.ucol_size,
                );
                (sym.diagonal().to_vec().into_boxed_slice(), m1, m2)
            })
            .collect()
    });

    info!(
        "symmetric preprocessing finished in {:.3} s",
        started.elapsed().as_secs_f64()
    );
    MtMatrixSym {
        threads: blobs
            .into_iter()
            .enumerate()
            .map(|(i, (diagonal, m1, m2))| ThreadMatrixSym {
                cpu: rt.cpus[i % rt.cpus.len()],
                diagonal,
                m1,
                m2,
            })
            .collect(),
    }
}
