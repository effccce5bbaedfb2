//! Low-precision scalar quantization.
//!
//! Values are mapped linearly from their observed training range onto
//! `0..=2^bits - 1`. Code-to-code distances under a global scale run on
//! integer sums and correct for the scale afterwards.

use tracing::{debug, instrument};

use crate::{codec::VectorCodec, distance::Metric};

use super::{QuantizationMode, QuantizerError, validate_bits, validate_samples, validate_vector};

/// Whether one scale covers the whole vector or each dimension has its own.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ScaleGranularity {
    /// One `(min, delta)` pair shared by every component.
    #[default]
    Global,
    /// A `(min, delta)` pair per component.
    PerDimension,
}

impl ScaleGranularity {
    /// Identifier written to persisted indexes.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Global => 0,
            Self::PerDimension => 1,
        }
    }

    /// Resolves a persisted identifier.
    ///
    /// # Errors
    /// Returns [`QuantizerError::UnknownGranularity`] for unknown identifiers.
    pub const fn from_id(id: u8) -> Result<Self, QuantizerError> {
        match id {
            0 => Ok(Self::Global),
            1 => Ok(Self::PerDimension),
            _ => Err(QuantizerError::UnknownGranularity { id }),
        }
    }
}

/// Untrained low-precision quantizer settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LowPrecisionConfig {
    dimension: usize,
    bits: u8,
    metric: Metric,
    granularity: ScaleGranularity,
}

impl LowPrecisionConfig {
    /// Validates a configuration storing `bits` per component.
    ///
    /// # Errors
    /// Returns [`QuantizerError::ZeroDimension`] or
    /// [`QuantizerError::InvalidBits`] for out-of-range inputs.
    pub fn new(dimension: usize, bits: u8, metric: Metric) -> Result<Self, QuantizerError> {
        if dimension == 0 {
            return Err(QuantizerError::ZeroDimension);
        }
        validate_bits(bits)?;
        Ok(Self {
            dimension,
            bits,
            metric,
            granularity: ScaleGranularity::Global,
        })
    }

    /// Selects per-dimension or global scaling.
    #[must_use]
    pub const fn with_granularity(mut self, granularity: ScaleGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Vector dimensionality.
    #[must_use]
    #[rustfmt::skip]
    pub const fn dimension(&self) -> usize { self.dimension }

    /// Bits per stored component.
    #[must_use]
    #[rustfmt::skip]
    pub const fn bits(&self) -> u8 { self.bits }

    /// Metric the distances approximate.
    #[must_use]
    #[rustfmt::skip]
    pub const fn metric(&self) -> Metric { self.metric }

    /// Scale granularity.
    #[must_use]
    #[rustfmt::skip]
    pub const fn granularity(&self) -> ScaleGranularity { self.granularity }

    /// Highest code value, `2^bits - 1`.
    #[must_use]
    pub const fn levels(&self) -> u8 {
        u8::MAX >> (8 - self.bits)
    }

    /// Number of `(min, delta)` pairs this configuration learns.
    #[must_use]
    pub const fn scale_slots(&self) -> usize {
        match self.granularity {
            ScaleGranularity::Global => 1,
            ScaleGranularity::PerDimension => self.dimension,
        }
    }

    /// Learns the value range of `count` row-major vectors.
    ///
    /// # Errors
    /// - [`QuantizerError::InsufficientSamples`] when `count` is zero.
    /// - [`QuantizerError::SampleBufferTooShort`] when `vectors` is too short.
    /// - [`QuantizerError::NonFinite`] when a sample contains NaN or infinity.
    #[instrument(
        name = "lpq.train",
        err,
        skip(self, vectors),
        fields(dimension = self.dimension, bits = self.bits)
    )]
    pub fn train(
        &self,
        vectors: &[f32],
        count: usize,
    ) -> Result<LowPrecisionQuantizer, QuantizerError> {
        if count == 0 {
            return Err(QuantizerError::InsufficientSamples {
                required: 1,
                provided: 0,
            });
        }
        validate_samples(vectors, count, self.dimension)?;

        let slots = self.scale_slots();
        let mut min = vec![f32::INFINITY; slots];
        let mut max = vec![f32::NEG_INFINITY; slots];
        for row in vectors.chunks_exact(self.dimension).take(count) {
            for (index, &value) in row.iter().enumerate() {
                let slot = index % slots;
                if let (Some(lo), Some(hi)) = (min.get_mut(slot), max.get_mut(slot)) {
                    *lo = lo.min(value);
                    *hi = hi.max(value);
                }
            }
        }

        let levels = f32::from(self.levels());
        let delta = min
            .iter()
            .zip(&max)
            .map(|(&lo, &hi)| {
                let range = hi - lo;
                if range > 0.0 { range / levels } else { 1.0 }
            })
            .collect();
        debug!(slots, "trained low-precision quantizer");
        Ok(LowPrecisionQuantizer::from_parts(*self, min, delta))
    }
}

/// A trained low-precision quantizer.
///
/// # Examples
/// ```
/// use flatnav_core::{LowPrecisionConfig, Metric};
///
/// let config = LowPrecisionConfig::new(2, 8, Metric::Euclidean).expect("config");
/// let quantizer = config.train(&[0.0, 0.0, 1.0, 1.0], 2).expect("train");
/// let code = quantizer.encode(&[1.0, 0.0]).expect("encode");
/// assert_eq!(code, vec![255, 0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LowPrecisionQuantizer {
    config: LowPrecisionConfig,
    min: Vec<f32>,
    delta: Vec<f32>,
}

/// Prepared query for [`LowPrecisionQuantizer`] distance evaluation.
///
/// For euclidean distance `values` holds the query shifted by each `min`.
/// For inner product it holds the query scaled by each `delta`, and `bias`
/// folds in the contribution of the offsets.
#[derive(Clone, Debug)]
pub struct LowPrecisionQuery {
    values: Vec<f32>,
    bias: f32,
}

impl LowPrecisionQuantizer {
    pub(crate) const fn from_parts(
        config: LowPrecisionConfig,
        min: Vec<f32>,
        delta: Vec<f32>,
    ) -> Self {
        Self { config, min, delta }
    }

    /// The configuration this quantizer was trained with.
    #[must_use]
    pub const fn config(&self) -> &LowPrecisionConfig {
        &self.config
    }

    /// Learned offsets, one per scale slot.
    #[must_use]
    pub fn min(&self) -> &[f32] {
        &self.min
    }

    /// Learned step sizes, one per scale slot.
    #[must_use]
    pub fn delta(&self) -> &[f32] {
        &self.delta
    }

    /// Encodes `vector` into one level per component.
    ///
    /// # Errors
    /// Returns [`QuantizerError::DimensionMismatch`] or
    /// [`QuantizerError::NonFinite`] for invalid vectors.
    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u8>, QuantizerError> {
        validate_vector(vector, self.config.dimension)?;
        let mut code = vec![0; self.config.dimension];
        self.encode_into(vector, &mut code);
        Ok(code)
    }

    /// Dequantizes `code` back to approximate floats.
    ///
    /// # Errors
    /// Returns [`QuantizerError::CodeLengthMismatch`] or
    /// [`QuantizerError::CodeOutOfRange`] for malformed codes.
    pub fn decode(&self, code: &[u8]) -> Result<Vec<f32>, QuantizerError> {
        self.validate_code(code)?;
        let mut vector = vec![0.0; self.config.dimension];
        self.decode_into(code, &mut vector);
        Ok(vector)
    }

    /// Approximate distance between a stored code and a raw query vector.
    ///
    /// # Errors
    /// Propagates validation failures for either argument.
    pub fn distance(&self, code: &[u8], query: &[f32]) -> Result<f32, QuantizerError> {
        self.validate_code(code)?;
        validate_vector(query, self.config.dimension)?;
        let prepared = self.prepare_query(query);
        Ok(self.query_distance(&prepared, code))
    }

    pub(crate) fn validate_code(&self, code: &[u8]) -> Result<(), QuantizerError> {
        if code.len() != self.config.dimension {
            return Err(QuantizerError::CodeLengthMismatch {
                expected: self.config.dimension,
                actual: code.len(),
            });
        }
        let max = self.config.levels();
        match code.iter().position(|&value| value > max) {
            Some(position) => Err(QuantizerError::CodeOutOfRange {
                position,
                value: code.get(position).copied().unwrap_or_default(),
                max,
            }),
            None => Ok(()),
        }
    }

    /// `(min, delta)` for every component, repeating the global pair when the
    /// scale is shared.
    fn scales(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.min
            .iter()
            .copied()
            .cycle()
            .zip(self.delta.iter().copied().cycle())
            .take(self.config.dimension)
    }

    fn global_scale(&self) -> Option<(f32, f32)> {
        match (self.config.granularity, self.min.first(), self.delta.first()) {
            (ScaleGranularity::Global, Some(&min), Some(&delta)) => Some((min, delta)),
            _ => None,
        }
    }
}

impl VectorCodec for LowPrecisionQuantizer {
    type Element = u8;
    type Query = LowPrecisionQuery;

    fn mode(&self) -> QuantizationMode {
        QuantizationMode::LowPrecision
    }

    fn metric(&self) -> Metric {
        self.config.metric
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn code_len(&self) -> usize {
        self.config.dimension
    }

    fn encode_into(&self, vector: &[f32], out: &mut [u8]) {
        let levels = f32::from(self.config.levels());
        for ((slot, &value), (min, delta)) in out.iter_mut().zip(vector).zip(self.scales()) {
            let level = ((value - min) / delta).round().clamp(0.0, levels);
            *slot = level as u8;
        }
    }

    fn decode_into(&self, code: &[u8], out: &mut [f32]) {
        for ((slot, &level), (min, delta)) in out.iter_mut().zip(code).zip(self.scales()) {
            *slot = f32::from(level).mul_add(delta, min);
        }
    }

    fn prepare_query(&self, query: &[f32]) -> LowPrecisionQuery {
        match self.config.metric {
            Metric::Euclidean => LowPrecisionQuery {
                values: query
                    .iter()
                    .zip(self.scales())
                    .map(|(&value, (min, _))| value - min)
                    .collect(),
                bias: 0.0,
            },
            Metric::InnerProduct => {
                let mut bias = 0.0;
                let values = query
                    .iter()
                    .zip(self.scales())
                    .map(|(&value, (min, delta))| {
                        bias += value * min;
                        value * delta
                    })
                    .collect();
                LowPrecisionQuery { values, bias }
            }
        }
    }

    #[inline]
    fn query_distance(&self, query: &LowPrecisionQuery, code: &[u8]) -> f32 {
        match self.config.metric {
            Metric::Euclidean => query
                .values
                .iter()
                .zip(code)
                .zip(self.scales())
                .map(|((&shifted, &level), (_, delta))| {
                    let diff = shifted - f32::from(level) * delta;
                    diff * diff
                })
                .sum(),
            Metric::InnerProduct => {
                let dot: f32 = query
                    .values
                    .iter()
                    .zip(code)
                    .map(|(&scaled, &level)| scaled * f32::from(level))
                    .sum();
                1.0 - (dot + query.bias)
            }
        }
    }

    #[inline]
    fn code_distance(&self, left: &[u8], right: &[u8]) -> f32 {
        if let Some((min, delta)) = self.global_scale() {
            return global_code_distance(self.config.metric, min, delta, left, right);
        }
        match self.config.metric {
            Metric::Euclidean => left
                .iter()
                .zip(right)
                .zip(self.scales())
                .map(|((&l, &r), (_, delta))| {
                    let diff = (f32::from(l) - f32::from(r)) * delta;
                    diff * diff
                })
                .sum(),
            Metric::InnerProduct => {
                let dot: f32 = left
                    .iter()
                    .zip(right)
                    .zip(self.scales())
                    .map(|((&l, &r), (min, delta))| {
                        f32::from(l).mul_add(delta, min) * f32::from(r).mul_add(delta, min)
                    })
                    .sum();
                1.0 - dot
            }
        }
    }
}

/// Integer-domain distance with an algebraic scale correction.
///
/// With `x = min + a * delta` and `y = min + b * delta` per component:
/// `|x - y|^2 = delta^2 * sum (a - b)^2` and
/// `<x, y> = D * min^2 + min * delta * (sum a + sum b) + delta^2 * sum a * b`.
fn global_code_distance(metric: Metric, min: f32, delta: f32, left: &[u8], right: &[u8]) -> f32 {
    let delta = f64::from(delta);
    match metric {
        Metric::Euclidean => {
            let squares: u64 = left
                .iter()
                .zip(right)
                .map(|(&l, &r)| u64::from(l.abs_diff(r)).pow(2))
                .sum();
            (delta * delta * squares as f64) as f32
        }
        Metric::InnerProduct => {
            let mut sum_left = 0_u64;
            let mut sum_right = 0_u64;
            let mut products = 0_u64;
            for (&l, &r) in left.iter().zip(right) {
                sum_left += u64::from(l);
                sum_right += u64::from(r);
                products += u64::from(l) * u64::from(r);
            }
            let min = f64::from(min);
            let dimension = left.len() as f64;
            let dot = dimension * min * min
                + min * delta * (sum_left + sum_right) as f64
                + delta * delta * products as f64;
            (1.0 - dot) as f32
        }
    }
}
