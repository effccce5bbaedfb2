//! Codec state serialisation for each [`VectorCodec`].

use std::io::{Read, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{
    codec::{FlatCodec, VectorCodec},
    distance::Metric,
    quantization::{
        LowPrecisionConfig, LowPrecisionQuantizer, ProductQuantizer, ProductQuantizerConfig,
        QuantizationMode, ScaleGranularity,
    },
};

use super::{PersistenceError, read_f32s, read_u8, read_u32, read_u64};

/// A codec whose trained state can be written to and restored from an index
/// file.
pub trait PersistentCodec: VectorCodec + Sized {
    /// Mode tag written to the header for this codec.
    const MODE: QuantizationMode;

    /// Writes the codec's trained state.
    ///
    /// # Errors
    /// Propagates writer failures.
    fn write_state<W: Write>(&self, writer: &mut W) -> Result<(), PersistenceError>;

    /// Restores the codec from state written by [`Self::write_state`].
    ///
    /// # Errors
    /// Returns [`PersistenceError`] for truncated or inconsistent state.
    fn read_state<R: Read>(
        reader: &mut R,
        metric: Metric,
        dimension: usize,
    ) -> Result<Self, PersistenceError>;

    /// Checks that a restored code is one this codec could have produced.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] describing the first invalid element.
    fn check_code(&self, code: &[Self::Element]) -> Result<(), PersistenceError>;
}

impl PersistentCodec for FlatCodec {
    const MODE: QuantizationMode = QuantizationMode::None;

    fn write_state<W: Write>(&self, _writer: &mut W) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn read_state<R: Read>(
        _reader: &mut R,
        metric: Metric,
        dimension: usize,
    ) -> Result<Self, PersistenceError> {
        Ok(Self::new(metric, dimension)?)
    }

    fn check_code(&self, code: &[f32]) -> Result<(), PersistenceError> {
        match code.iter().position(|value| !value.is_finite()) {
            Some(position) => Err(PersistenceError::inconsistent(format!(
                "stored vector component {position} is not finite"
            ))),
            None => Ok(()),
        }
    }
}

impl PersistentCodec for ProductQuantizer {
    const MODE: QuantizationMode = QuantizationMode::Product;

    fn write_state<W: Write>(&self, writer: &mut W) -> Result<(), PersistenceError> {
        let config = self.config();
        writer.write_u32::<LittleEndian>(config.subspaces() as u32)?;
        writer.write_u8(config.bits())?;
        writer.write_u32::<LittleEndian>(config.iterations())?;
        writer.write_u64::<LittleEndian>(config.seed())?;
        for &value in self.centroids() {
            writer.write_f32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    fn read_state<R: Read>(
        reader: &mut R,
        metric: Metric,
        dimension: usize,
    ) -> Result<Self, PersistenceError> {
        let subspaces = read_u32(reader)? as usize;
        let bits = read_u8(reader)?;
        let iterations = read_u32(reader)?;
        let seed = read_u64(reader)?;
        let config = ProductQuantizerConfig::new(dimension, subspaces, bits, metric)?
            .with_iterations(iterations)?
            .with_seed(seed);
        let len = dimension
            .checked_mul(config.centroids_per_subspace())
            .ok_or_else(|| {
                PersistenceError::inconsistent(format!(
                    "centroid table for dimension {dimension} overflows the address space"
                ))
            })?;
        let centroids = read_f32s(reader, len)?;
        if centroids.iter().any(|value| !value.is_finite()) {
            return Err(PersistenceError::inconsistent("centroid table holds non-finite values"));
        }
        Ok(Self::from_parts(config, centroids))
    }

    fn check_code(&self, code: &[u8]) -> Result<(), PersistenceError> {
        Ok(self.validate_code(code)?)
    }
}

impl PersistentCodec for LowPrecisionQuantizer {
    const MODE: QuantizationMode = QuantizationMode::LowPrecision;

    fn write_state<W: Write>(&self, writer: &mut W) -> Result<(), PersistenceError> {
        let config = self.config();
        writer.write_u8(config.bits())?;
        writer.write_u8(config.granularity().id())?;
        writer.write_u32::<LittleEndian>(self.min().len() as u32)?;
        for &value in self.min().iter().chain(self.delta()) {
            writer.write_f32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    fn read_state<R: Read>(
        reader: &mut R,
        metric: Metric,
        dimension: usize,
    ) -> Result<Self, PersistenceError> {
        let bits = read_u8(reader)?;
        let granularity = ScaleGranularity::from_id(read_u8(reader)?)?;
        let slots = read_u32(reader)? as usize;
        let config = LowPrecisionConfig::new(dimension, bits, metric)?.with_granularity(granularity);
        if slots != config.scale_slots() {
            return Err(PersistenceError::inconsistent(format!(
                "{slots} scale slots stored but {} expected",
                config.scale_slots()
            )));
        }
        let min = read_f32s(reader, slots)?;
        let delta = read_f32s(reader, slots)?;
        if min.iter().any(|value| !value.is_finite())
            || delta.iter().any(|value| !value.is_finite() || *value <= 0.0)
        {
            return Err(PersistenceError::inconsistent("scale parameters are not finite and positive"));
        }
        Ok(Self::from_parts(config, min, delta))
    }

    fn check_code(&self, code: &[u8]) -> Result<(), PersistenceError> {
        Ok(self.validate_code(code)?)
    }
}
