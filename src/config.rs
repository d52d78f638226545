//! Runtime and encoding configuration, from explicit setters or from the
//! environment variables the engine has always honored (`MT_CONF`,
//! `XFORM_CONF`, `WINDOW_SIZE`, `SAMPLES`, `SAMPLING_PROB`,
//! `SPLIT_BLOCKS`, `ENCODE_DELTAS`).

use std::env;

use crate::error::ConfigError;
use crate::order::IterOrder;

pub const MT_CONF: &str = "MT_CONF";
pub const XFORM_CONF: &str = "XFORM_CONF";
pub const WINDOW_SIZE: &str = "WINDOW_SIZE";
pub const SAMPLES: &str = "SAMPLES";
pub const SAMPLING_PROB: &str = "SAMPLING_PROB";
pub const SPLIT_BLOCKS: &str = "SPLIT_BLOCKS";
pub const ENCODE_DELTAS: &str = "ENCODE_DELTAS";

/// Thread placement: one worker per CPU id listed in `MT_CONF`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub cpus: Vec<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            cpus: vec![0, 1, 2, 3],
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(MT_CONF) {
            Ok(s) => Ok(RuntimeConfig {
                cpus: parse_cpu_list(&s)?,
            }),
            Err(_) => Ok(RuntimeConfig::default()),
        }
    }

    pub fn nr_threads(&self) -> usize {
        self.cpus.len()
    }
}

/// Tunables of the pattern engine. The defaults are the ones the original
/// preprocessing pipeline has always used: runs of at least 4, at most
/// 254, and a 10% share of the partition's nonzeros to keep a delta.
#[derive(Clone, Debug)]
pub struct EncodingOptions {
    pub min_limit: usize,
    pub max_limit: usize,
    pub min_perc: f64,
    pub window_size: usize,
    pub samples_max: usize,
    pub sampling_prob: f64,
    pub split_blocks: bool,
    pub full_colind: bool,
    pub ucol_size: usize,
    /// Orders the engine may pick, in preference-breaking id order.
    pub xforms: Vec<IterOrder>,
    /// When set, bypass statistics and encode exactly these deltas for
    /// the paired `xforms` entries, in order.
    pub deltas: Option<Vec<Vec<usize>>>,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        EncodingOptions {
            min_limit: 4,
            max_limit: 255 - 1,
            min_perc: 0.1,
            window_size: 0,
            samples_max: usize::MAX,
            sampling_prob: 0.0,
            split_blocks: false,
            full_colind: false,
            ucol_size: 4,
            xforms: IterOrder::encodable().collect(),
            deltas: None,
        }
    }
}

impl EncodingOptions {
    /// Read the encoding-related environment variables on top of the
    /// defaults. Unparseable values are fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut opts = EncodingOptions::default();
        if let Ok(s) = env::var(XFORM_CONF) {
            opts.xforms = parse_xform_list(&s)?;
        }
        if let Ok(s) = env::var(WINDOW_SIZE) {
            opts.window_size = parse_int(WINDOW_SIZE, &s)?;
        }
        if let Ok(s) = env::var(SAMPLES) {
            opts.samples_max = parse_int(SAMPLES, &s)?;
        }
        if let Ok(s) = env::var(SAMPLING_PROB) {
            opts.sampling_prob = s
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidFloat(SAMPLING_PROB, s.clone()))?;
        }
        if env::var(SPLIT_BLOCKS).is_ok() {
            opts.split_blocks = true;
        }
        if let Ok(s) = env::var(ENCODE_DELTAS) {
            let lists = parse_delta_lists(&s)?;
            if lists.len() > opts.xforms.len() {
                return Err(ConfigError::MalformedDeltaList(s));
            }
            opts.deltas = Some(lists);
        }
        Ok(opts)
    }

    /// The `(order, deltas)` pairs of the serial-encoding path, or `None`
    /// when statistics drive the choice.
    pub fn serial_deltas(&self) -> Option<Vec<(IterOrder, Vec<usize>)>> {
        self.deltas.as_ref().map(|lists| {
            self.xforms
                .iter()
                .copied()
                .zip(lists.iter().cloned())
                .collect()
        })
    }
}

fn parse_int(var: &'static str, s: &str) -> Result<usize, ConfigError> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidInteger(var, s.to_owned()))
}

/// `MT_CONF`-style comma-separated CPU ids.
pub fn parse_cpu_list(s: &str) -> Result<Vec<usize>, ConfigError> {
    let cpus = s
        .split(',')
        .map(|tok| parse_int(MT_CONF, tok))
        .collect::<Result<Vec<_>, _>>()?;
    if cpus.is_empty() {
        return Err(ConfigError::EmptyCpuList);
    }
    Ok(cpus)
}

/// `XFORM_CONF`-style comma-separated iteration-order ids.
pub fn parse_xform_list(s: &str) -> Result<Vec<IterOrder>, ConfigError> {
    s.split(',')
        .map(|tok| {
            let id = parse_int(XFORM_CONF, tok)?;
            let id = u8::try_from(id).map_err(|_| ConfigError::UnknownOrderId(id))?;
            IterOrder::try_from(id).map_err(|_| ConfigError::UnknownOrderId(id as usize))
        })
        .collect()
}

/// `ENCODE_DELTAS`-style `<d1,d2,..><..>` delta lists.
pub fn parse_delta_lists(s: &str) -> Result<Vec<Vec<usize>>, ConfigError> {
    let s = s.trim();
    if !s.starts_with('<') || !s.ends_with('>') {
        return Err(ConfigError::MalformedDeltaList(s.to_owned()));
    }
    s[1..s.len() - 1]
        .split("><")
        .map(|group| {
            group
                .split(',')
                .map(|tok| parse_int(ENCODE_DELTAS, tok))
                .collect()
        })
        .collect()
}
