//! Product quantization: per-subspace codebooks with table-driven distances.

use tracing::{debug, instrument};

use crate::{
    codec::VectorCodec,
    distance::{Metric, dot, squared_l2},
};

use super::{
    QuantizationMode, QuantizerError,
    kmeans::{KMeans, Subspace, nearest},
    validate_bits, validate_samples, validate_vector,
};

const DEFAULT_ITERATIONS: u32 = 25;
const DEFAULT_SEED: u64 = 0x5EED_CAFE;

/// Untrained product quantizer settings.
///
/// # Examples
/// ```
/// use flatnav_core::{Metric, ProductQuantizerConfig};
///
/// let config = ProductQuantizerConfig::new(4, 2, 1, Metric::Euclidean)
///     .expect("valid configuration");
/// let samples = [0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0];
/// let quantizer = config.train(&samples, 2).expect("enough samples");
/// assert_eq!(quantizer.code_len(), 2);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProductQuantizerConfig {
    dimension: usize,
    subspaces: usize,
    bits: u8,
    metric: Metric,
    iterations: u32,
    seed: u64,
}

impl ProductQuantizerConfig {
    /// Validates a configuration splitting `dimension` into `subspaces`
    /// codebooks of `2^bits` centroids each.
    ///
    /// # Errors
    /// - [`QuantizerError::ZeroDimension`] when `dimension` is zero.
    /// - [`QuantizerError::InvalidSubspaces`] unless `1 <= subspaces <= dimension`.
    /// - [`QuantizerError::InvalidBits`] unless `1 <= bits <= 8`.
    pub fn new(
        dimension: usize,
        subspaces: usize,
        bits: u8,
        metric: Metric,
    ) -> Result<Self, QuantizerError> {
        if dimension == 0 {
            return Err(QuantizerError::ZeroDimension);
        }
        if subspaces == 0 || subspaces > dimension {
            return Err(QuantizerError::InvalidSubspaces {
                subspaces,
                dimension,
            });
        }
        validate_bits(bits)?;
        Ok(Self {
            dimension,
            subspaces,
            bits,
            metric,
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
        })
    }

    /// Overrides the maximum number of k-means refinement passes.
    ///
    /// # Errors
    /// Returns [`QuantizerError::ZeroIterations`] when `iterations` is zero.
    pub fn with_iterations(mut self, iterations: u32) -> Result<Self, QuantizerError> {
        if iterations == 0 {
            return Err(QuantizerError::ZeroIterations);
        }
        self.iterations = iterations;
        Ok(self)
    }

    /// Seeds centroid initialisation so training is reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Vector dimensionality.
    #[must_use]
    #[rustfmt::skip]
    pub const fn dimension(&self) -> usize { self.dimension }

    /// Number of subspaces, which is also the code length.
    #[must_use]
    #[rustfmt::skip]
    pub const fn subspaces(&self) -> usize { self.subspaces }

    /// Bits per subspace code.
    #[must_use]
    #[rustfmt::skip]
    pub const fn bits(&self) -> u8 { self.bits }

    /// Metric the distance tables approximate.
    #[must_use]
    #[rustfmt::skip]
    pub const fn metric(&self) -> Metric { self.metric }

    /// Maximum k-means passes per subspace.
    #[must_use]
    #[rustfmt::skip]
    pub const fn iterations(&self) -> u32 { self.iterations }

    /// Initialisation seed.
    #[must_use]
    #[rustfmt::skip]
    pub const fn seed(&self) -> u64 { self.seed }

    /// Centroids per subspace.
    #[must_use]
    pub const fn centroids_per_subspace(&self) -> usize {
        1 << self.bits
    }

    /// Clusters every subspace of `count` row-major vectors.
    ///
    /// # Errors
    /// - [`QuantizerError::InsufficientSamples`] when `count < 2^bits`.
    /// - [`QuantizerError::SampleBufferTooShort`] when `vectors` holds fewer
    ///   than `count * dimension` values.
    /// - [`QuantizerError::NonFinite`] when a sample contains NaN or infinity.
    #[instrument(
        name = "pq.train",
        err,
        skip(self, vectors),
        fields(dimension = self.dimension, subspaces = self.subspaces, bits = self.bits)
    )]
    pub fn train(&self, vectors: &[f32], count: usize) -> Result<ProductQuantizer, QuantizerError> {
        let clusters = self.centroids_per_subspace();
        if count < clusters {
            return Err(QuantizerError::InsufficientSamples {
                required: clusters,
                provided: count,
            });
        }
        validate_samples(vectors, count, self.dimension)?;

        let layout = subspace_layout(self.dimension, self.subspaces);
        let kmeans = KMeans {
            clusters,
            iterations: self.iterations,
            seed: self.seed,
        };
        let mut centroids = Vec::with_capacity(self.dimension * clusters);
        for subspace in &layout {
            centroids.extend(kmeans.fit(vectors, count, self.dimension, *subspace));
        }
        debug!(centroids = centroids.len(), "trained product quantizer");
        Ok(ProductQuantizer::from_parts(*self, centroids))
    }
}

/// Splits `dimension` into `subspaces` contiguous windows. The first
/// `dimension % subspaces` windows are one component wider.
pub(crate) fn subspace_layout(dimension: usize, subspaces: usize) -> Vec<Subspace> {
    let base = dimension / subspaces;
    let extra = dimension % subspaces;
    let mut offset = 0;
    (0..subspaces)
        .map(|index| {
            let width = base + usize::from(index < extra);
            let subspace = Subspace { offset, width };
            offset += width;
            subspace
        })
        .collect()
}

/// A trained product quantizer.
///
/// Centroids for subspace `s` occupy `centroids[offset_s * k..(offset_s + width_s) * k]`
/// where `k = 2^bits`, so the whole codebook is exactly `dimension * k`
/// values. Symmetric centroid-to-centroid tables are derived at construction
/// and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductQuantizer {
    config: ProductQuantizerConfig,
    layout: Vec<Subspace>,
    centroids: Vec<f32>,
    symmetric: Vec<f32>,
}

/// Per-query table of partial distances, one row per subspace.
#[derive(Clone, Debug)]
pub struct ProductQuery {
    table: Vec<f32>,
}

impl ProductQuantizer {
    pub(crate) fn from_parts(config: ProductQuantizerConfig, centroids: Vec<f32>) -> Self {
        let layout = subspace_layout(config.dimension, config.subspaces);
        let mut quantizer = Self {
            config,
            layout,
            centroids,
            symmetric: Vec::new(),
        };
        quantizer.symmetric = quantizer.build_symmetric_tables();
        quantizer
    }

    /// The configuration this quantizer was trained with.
    #[must_use]
    pub const fn config(&self) -> &ProductQuantizerConfig {
        &self.config
    }

    /// Bytes per code.
    #[must_use]
    pub const fn code_len(&self) -> usize {
        self.config.subspaces
    }

    /// Flattened codebook in subspace order.
    #[must_use]
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    /// Encodes `vector` into one centroid index per subspace.
    ///
    /// # Errors
    /// Returns [`QuantizerError::DimensionMismatch`] or
    /// [`QuantizerError::NonFinite`] for invalid vectors.
    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u8>, QuantizerError> {
        validate_vector(vector, self.config.dimension)?;
        let mut code = vec![0; self.code_len()];
        self.encode_into(vector, &mut code);
        Ok(code)
    }

    /// Concatenates the centroids selected by `code`.
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
    /// Callers scoring many codes against one query should use
    /// [`VectorCodec::prepare_query`] once and [`VectorCodec::query_distance`]
    /// per code instead.
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
        if code.len() != self.code_len() {
            return Err(QuantizerError::CodeLengthMismatch {
                expected: self.code_len(),
                actual: code.len(),
            });
        }
        let max = self.config.centroids_per_subspace() - 1;
        match code.iter().position(|&value| usize::from(value) > max) {
            Some(position) => Err(QuantizerError::CodeOutOfRange {
                position,
                value: code.get(position).copied().unwrap_or_default(),
                max: u8::try_from(max).unwrap_or(u8::MAX),
            }),
            None => Ok(()),
        }
    }

    fn codebook(&self, subspace: &Subspace) -> &[f32] {
        let k = self.config.centroids_per_subspace();
        let start = subspace.offset * k;
        self.centroids
            .get(start..start + subspace.width * k)
            .unwrap_or(&[])
    }

    fn partial(&self, left: &[f32], right: &[f32]) -> f32 {
        match self.config.metric {
            Metric::Euclidean => squared_l2(left, right),
            Metric::InnerProduct => -dot(left, right),
        }
    }

    fn bias(&self) -> f32 {
        match self.config.metric {
            Metric::Euclidean => 0.0,
            Metric::InnerProduct => 1.0,
        }
    }

    fn build_symmetric_tables(&self) -> Vec<f32> {
        let k = self.config.centroids_per_subspace();
        let mut tables = Vec::with_capacity(self.layout.len() * k * k);
        for subspace in &self.layout {
            let codebook = self.codebook(subspace);
            for left in codebook.chunks_exact(subspace.width) {
                for right in codebook.chunks_exact(subspace.width) {
                    tables.push(self.partial(left, right));
                }
            }
        }
        tables
    }
}

impl VectorCodec for ProductQuantizer {
    type Element = u8;
    type Query = ProductQuery;

    fn mode(&self) -> QuantizationMode {
        QuantizationMode::Product
    }

    fn metric(&self) -> Metric {
        self.config.metric
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn code_len(&self) -> usize {
        self.config.subspaces
    }

    fn encode_into(&self, vector: &[f32], out: &mut [u8]) {
        for (slot, subspace) in out.iter_mut().zip(&self.layout) {
            let index = nearest(subspace.slice(vector), self.codebook(subspace), subspace.width);
            *slot = u8::try_from(index).unwrap_or(u8::MAX);
        }
    }

    fn decode_into(&self, code: &[u8], out: &mut [f32]) {
        for (&index, subspace) in code.iter().zip(&self.layout) {
            let start = usize::from(index) * subspace.width;
            let centroid = self
                .codebook(subspace)
                .get(start..start + subspace.width)
                .unwrap_or(&[]);
            if let Some(target) = out.get_mut(subspace.offset..subspace.offset + subspace.width) {
                target.copy_from_slice(centroid);
            }
        }
    }

    fn prepare_query(&self, query: &[f32]) -> ProductQuery {
        let k = self.config.centroids_per_subspace();
        let mut table = Vec::with_capacity(self.layout.len() * k);
        for subspace in &self.layout {
            let part = subspace.slice(query);
            for centroid in self.codebook(subspace).chunks_exact(subspace.width) {
                table.push(self.partial(part, centroid));
            }
        }
        ProductQuery { table }
    }

    #[inline]
    fn query_distance(&self, query: &ProductQuery, code: &[u8]) -> f32 {
        let k = self.config.centroids_per_subspace();
        let sum: f32 = query
            .table
            .chunks_exact(k)
            .zip(code)
            .map(|(row, &index)| row.get(usize::from(index)).copied().unwrap_or(0.0))
            .sum();
        sum + self.bias()
    }

    #[inline]
    fn code_distance(&self, left: &[u8], right: &[u8]) -> f32 {
        let k = self.config.centroids_per_subspace();
        let sum: f32 = self
            .symmetric
            .chunks_exact(k * k)
            .zip(left.iter().zip(right))
            .map(|(table, (&l, &r))| {
                table
                    .get(usize::from(l) * k + usize::from(r))
                    .copied()
                    .unwrap_or(0.0)
            })
            .sum();
        sum + self.bias()
    }
}
