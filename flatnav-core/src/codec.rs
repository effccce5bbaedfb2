//! Storage and distance strategy seam between the graph and its vectors.
//!
//! The graph never touches raw vectors directly. Every node holds a code
//! produced by a [`VectorCodec`], and every distance the graph evaluates goes
//! through the codec: [`VectorCodec::query_distance`] during traversal and
//! [`VectorCodec::code_distance`] during neighbour selection and pruning.
//! Exact storage is [`FlatCodec`]; the quantizers in [`crate::quantization`]
//! provide compressed storage with approximate distances.

use std::{
    fmt,
    io::{self, Read, Write},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{distance::Metric, quantization::QuantizationMode};

/// Scalar element stored in a code buffer.
pub trait CodeElement: Copy + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Serialises one element in little-endian order.
    ///
    /// # Errors
    /// Propagates writer failures.
    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()>;

    /// Reads one little-endian element.
    ///
    /// # Errors
    /// Propagates reader failures, including unexpected end of input.
    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self>;
}

impl CodeElement for f32 {
    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_f32::<LittleEndian>(self)
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_f32::<LittleEndian>()
    }
}

impl CodeElement for u8 {
    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self)
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_u8()
    }
}

/// Encodes vectors into fixed-length codes and evaluates distances over them.
///
/// Implementations are immutable once constructed and safe to share across
/// threads. Callers guarantee that vectors passed to [`Self::encode_into`] and
/// [`Self::prepare_query`] have exactly [`Self::dimension`] finite components
/// and that code slices have exactly [`Self::code_len`] elements.
pub trait VectorCodec: fmt::Debug + Send + Sync {
    /// Element type of a stored code.
    type Element: CodeElement;
    /// Per-query state computed once and reused against many codes.
    type Query: Send;

    /// Quantization mode persisted alongside the index.
    fn mode(&self) -> QuantizationMode;

    /// Metric approximated by the codec's distances.
    fn metric(&self) -> Metric;

    /// Dimensionality of the raw vectors the codec accepts.
    fn dimension(&self) -> usize;

    /// Number of elements in one code.
    fn code_len(&self) -> usize;

    /// Writes the code for `vector` into `out`.
    fn encode_into(&self, vector: &[f32], out: &mut [Self::Element]);

    /// Reconstructs an approximation of the vector behind `code`.
    fn decode_into(&self, code: &[Self::Element], out: &mut [f32]);

    /// Precomputes whatever the codec needs to score codes against `query`.
    fn prepare_query(&self, query: &[f32]) -> Self::Query;

    /// Distance between a prepared query and a stored code.
    fn query_distance(&self, query: &Self::Query, code: &[Self::Element]) -> f32;

    /// Distance between two stored codes.
    fn code_distance(&self, left: &[Self::Element], right: &[Self::Element]) -> f32;
}

/// Stores raw vectors and evaluates exact distances.
///
/// # Examples
/// ```
/// use flatnav_core::{FlatCodec, Metric, VectorCodec};
///
/// let codec = FlatCodec::new(Metric::Euclidean, 2).expect("positive dimension");
/// let query = codec.prepare_query(&[0.0, 0.0]);
/// assert!((codec.query_distance(&query, &[3.0, 4.0]) - 25.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlatCodec {
    metric: Metric,
    dimension: usize,
}

impl FlatCodec {
    /// Creates a codec for `dimension`-component vectors.
    ///
    /// # Errors
    /// Returns [`crate::DistanceError::ZeroLength`] when `dimension` is zero.
    pub fn new(metric: Metric, dimension: usize) -> crate::distance::Result<Self> {
        if dimension == 0 {
            return Err(crate::DistanceError::ZeroLength);
        }
        Ok(Self { metric, dimension })
    }
}

impl VectorCodec for FlatCodec {
    type Element = f32;
    type Query = Vec<f32>;

    fn mode(&self) -> QuantizationMode {
        QuantizationMode::None
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn code_len(&self) -> usize {
        self.dimension
    }

    fn encode_into(&self, vector: &[f32], out: &mut [f32]) {
        out.copy_from_slice(vector);
    }

    fn decode_into(&self, code: &[f32], out: &mut [f32]) {
        out.copy_from_slice(code);
    }

    fn prepare_query(&self, query: &[f32]) -> Vec<f32> {
        query.to_vec()
    }

    #[inline]
    fn query_distance(&self, query: &Vec<f32>, code: &[f32]) -> f32 {
        self.metric.distance(query, code)
    }

    #[inline]
    fn code_distance(&self, left: &[f32], right: &[f32]) -> f32 {
        self.metric.distance(left, right)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Metric::Euclidean, 2.0)]
    #[case(Metric::InnerProduct, 1.0)]
    fn flat_codec_matches_exact_metric(#[case] metric: Metric, #[case] expected: f32) {
        let codec = FlatCodec::new(metric, 2).expect("positive dimension");
        let mut code = [0.0_f32; 2];
        codec.encode_into(&[1.0, 0.0], &mut code);
        let query = codec.prepare_query(&[0.0, 1.0]);
        assert!((codec.query_distance(&query, &code) - expected).abs() < f32::EPSILON);
        assert!((codec.code_distance(&code, &[0.0, 1.0]) - expected).abs() < f32::EPSILON);
    }

    #[test]
    fn flat_codec_rejects_zero_dimension() {
        assert!(FlatCodec::new(Metric::Euclidean, 0).is_err());
    }

    #[test]
    fn code_elements_use_little_endian() {
        let mut bytes = Vec::new();
        1.5_f32.write_le(&mut bytes).expect("write f32");
        7_u8.write_le(&mut bytes).expect("write u8");
        assert_eq!(bytes, [0x00, 0x00, 0xC0, 0x3F, 0x07]);

        let mut cursor = Cursor::new(bytes);
        assert!((f32::read_le(&mut cursor).expect("read f32") - 1.5).abs() < f32::EPSILON);
        assert_eq!(u8::read_le(&mut cursor).expect("read u8"), 7);
        assert!(u8::read_le(&mut cursor).is_err());
    }
}
