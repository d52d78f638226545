//! Adaptive pattern-compressing sparse matrix encoding for multi-core
//! SpMV.
//!
//! The engine takes one [`SparsePartition`] per worker, discovers the
//! geometric substructures (horizontal, vertical, diagonal and
//! anti-diagonal runs, dense blocks) that carry most of its nonzeros,
//! rewrites rows into a mix of plain elements and [`DeltaRle`] pattern
//! descriptors, and serializes the result into the packed `ctl` control
//! stream and companion value arrays consumed at SpMV time. Partitions
//! are preprocessed in parallel and fused into a multi-threaded matrix.
//!
//! ```
//! use csx::{build_mt, partition_stream, CooElem, EncodingOptions, RuntimeConfig};
//!
//! // A 1x5 matrix that is one horizontal run.
//! let coo: Vec<CooElem<i64, f64>> =
//!     (1..=5).map(|c| CooElem::new(1, c, c as f64)).collect();
//! let parts = partition_stream(coo, 1, 5, 5, 1);
//! let rt = RuntimeConfig { cpus: vec![0] };
//! let mt = build_mt(parts, &EncodingOptions::default(), &rt);
//! assert_eq!(mt.threads[0].matrix.patterns.len(), 1);
//! assert_eq!(mt.points().count(), 5);
//! ```

mod config;
mod csr;
mod ctl;
mod drle;
mod elems;
mod error;
mod matrix;
mod mt;
mod order;
mod partition;
mod symmetric;
mod transform;

pub use crate::{
    config::{parse_cpu_list, parse_delta_lists, parse_xform_list, EncodingOptions, RuntimeConfig},
    csr::csr_points,
    ctl::{CtlBuilder, CTL_ID_MASK, CTL_ID_SPARSE, CTL_NR_BIT, CTL_RJMP_BIT, CTL_SIZE_MAX},
    drle::{DeltaStats, DrleManager, Stats},
    elems::{CooElem, CsxIndex, CsxValue, DeltaRle, Elem, ElemKind, RowElement},
    error::{ConfigError, CsxError, InputError},
    matrix::{CsxMatrix, CsxPoints, PatternEntry},
    mt::{
        build_mt, build_mt_sym, partition_stream, partition_stream_sym, MtMatrix, MtMatrixSym,
        ThreadMatrix, ThreadMatrixSym,
    },
    order::{IterOrder, XFORM_MAX},
    partition::{Points, SparsePartition, Window},
    symmetric::{SparsePartitionSym, SymState},
};

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
