// src/container/header.rs

//! Fixed-size records of the compressed image container.
//!
//! Global header, 10 bytes:
//!
//! | byte | content                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | predictor (bits 0-1), color profile (2-5), version (6-7) |
//! | 1    | segment size exponent (bits 0-2), NEAR (3-7)             |
//! | 2-9  | block height, block width, block rows, block columns     |
//!
//! The four geometry fields are little-endian `u16`. Each block payload is
//! preceded by a little-endian `u32` byte count.

use crate::encode::constants::{MAX_BUFFER_EXP, MAX_NEAR};
use crate::encode::params::CodecParams;
use crate::utils::error::{CodecError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub const GLOBAL_HEADER_SIZE: usize = 10;
pub const BLOCK_HEADER_SIZE: usize = 4;
/// Smallest block payload: the raw first sample and one byte of coder state.
pub const MIN_BLOCK_PAYLOAD: usize = 2;

/// The only container version this crate reads and writes.
pub const FORMAT_VERSION: u8 = 0;
/// Predictor id of the median edge detector.
pub const PREDICTOR_MED: u8 = 1;

/// Color profile of the coded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChromaMode {
    Gray = 0,
    Yuv420 = 1,
    Yuv422 = 2,
    Yuv444 = 3,
    Bayer = 4,
}

impl TryFrom<u8> for ChromaMode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ChromaMode::Gray),
            1 => Ok(ChromaMode::Yuv420),
            2 => Ok(ChromaMode::Yuv422),
            3 => Ok(ChromaMode::Yuv444),
            4 => Ok(ChromaMode::Bayer),
            other => Err(CodecError::UnsupportedConfig(format!(
                "unknown chroma mode {}",
                other
            ))),
        }
    }
}

/// Maps a premature end of input to a truncation error.
pub(crate) fn map_eof(what: &str) -> impl FnOnce(io::Error) -> CodecError + '_ {
    move |err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Truncated(format!("input ended inside the {}", what))
        } else {
            CodecError::Io(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeader {
    pub predictor: u8,
    /// Raw color profile field; see [`ChromaMode`].
    pub color_profile: u8,
    pub version: u8,
    pub buffer_exp: u8,
    pub near: u8,
    pub blk_height: u16,
    pub blk_width: u16,
    pub blk_rows: u16,
    pub blk_cols: u16,
}

impl GlobalHeader {
    /// Header for a gray image split into `blk_rows` x `blk_cols` blocks.
    pub fn new(
        params: &CodecParams,
        blk_width: u16,
        blk_height: u16,
        blk_rows: u16,
        blk_cols: u16,
    ) -> Self {
        GlobalHeader {
            predictor: PREDICTOR_MED,
            color_profile: ChromaMode::Gray as u8,
            version: FORMAT_VERSION,
            buffer_exp: params.buffer_exp,
            near: params.near,
            blk_height,
            blk_width,
            blk_rows,
            blk_cols,
        }
    }

    pub fn image_width(&self) -> u32 {
        self.blk_width as u32 * self.blk_cols as u32
    }

    pub fn image_height(&self) -> u32 {
        self.blk_height as u32 * self.blk_rows as u32
    }

    pub fn num_blocks(&self) -> usize {
        self.blk_rows as usize * self.blk_cols as usize
    }

    /// Rejects anything this decoder cannot handle.
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedConfig(format!(
                "container version {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        let chroma = ChromaMode::try_from(self.color_profile)?;
        if chroma != ChromaMode::Gray {
            return Err(CodecError::UnsupportedConfig(format!(
                "chroma mode {:?}; only gray images are supported",
                chroma
            )));
        }
        if self.predictor != PREDICTOR_MED {
            return Err(CodecError::UnsupportedConfig(format!(
                "predictor {}",
                self.predictor
            )));
        }
        if self.near > MAX_NEAR || self.buffer_exp > MAX_BUFFER_EXP {
            return Err(CodecError::UnsupportedConfig(format!(
                "NEAR {} with segment exponent {}",
                self.near, self.buffer_exp
            )));
        }
        if self.blk_width == 0 || self.blk_height == 0 {
            return Err(CodecError::UnsupportedConfig(format!(
                "empty block geometry {}x{}",
                self.blk_width, self.blk_height
            )));
        }
        Ok(())
    }

    /// Coding parameters carried by the header.
    pub fn codec_params(&self) -> CodecParams {
        CodecParams::new()
            .with_near(self.near)
            .with_buffer_exp(self.buffer_exp)
    }

    /// Packs the header. Fails if a field overflows its bit width.
    pub fn to_bytes(&self) -> Result<[u8; GLOBAL_HEADER_SIZE]> {
        let fits = |value: u8, bits: u32| u32::from(value) < (1 << bits);
        if !fits(self.predictor, 2)
            || !fits(self.color_profile, 4)
            || !fits(self.version, 2)
            || !fits(self.buffer_exp, 3)
            || !fits(self.near, 5)
        {
            return Err(CodecError::UnsupportedConfig(format!(
                "header fields out of range: {:?}",
                self
            )));
        }

        let mut bytes = [0u8; GLOBAL_HEADER_SIZE];
        bytes[0] = self.predictor | (self.color_profile << 2) | (self.version << 6);
        bytes[1] = self.buffer_exp | (self.near << 3);
        let mut geometry = &mut bytes[2..];
        geometry.write_u16::<LittleEndian>(self.blk_height)?;
        geometry.write_u16::<LittleEndian>(self.blk_width)?;
        geometry.write_u16::<LittleEndian>(self.blk_rows)?;
        geometry.write_u16::<LittleEndian>(self.blk_cols)?;
        Ok(bytes)
    }

    /// Unpacks a header without judging its content.
    pub fn from_bytes(bytes: &[u8; GLOBAL_HEADER_SIZE]) -> Result<Self> {
        let mut geometry = &bytes[2..];
        Ok(GlobalHeader {
            predictor: bytes[0] & 0x03,
            color_profile: (bytes[0] >> 2) & 0x0F,
            version: bytes[0] >> 6,
            buffer_exp: bytes[1] & 0x07,
            near: bytes[1] >> 3,
            blk_height: geometry.read_u16::<LittleEndian>()?,
            blk_width: geometry.read_u16::<LittleEndian>()?,
            blk_rows: geometry.read_u16::<LittleEndian>()?,
            blk_cols: geometry.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; GLOBAL_HEADER_SIZE];
        reader
            .read_exact(&mut bytes)
            .map_err(map_eof("global header"))?;
        Self::from_bytes(&bytes)
    }
}

/// Size record preceding each block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub size: u32,
}

impl BlockHeader {
    pub fn new(size: usize) -> Result<Self> {
        let size = u32::try_from(size).map_err(|_| {
            CodecError::InvalidData(format!("block payload of {} bytes is too large", size))
        })?;
        Ok(BlockHeader { size })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let size = reader
            .read_u32::<LittleEndian>()
            .map_err(map_eof("block header"))?;
        Ok(BlockHeader { size })
    }
}
