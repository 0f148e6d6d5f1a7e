//! Self-contained bytecode images.
//!
//! A `Chunk` refers to strings by heap handle, so it cannot outlive its
//! heap. An image copies every string constant's text out of the heap and
//! can be written to disk, read back and re-interned into another heap.
//!
//! Encoding: one version byte followed by the postcard body.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bytecode::chunk::{Chunk, LineRun};
use crate::lang::object::Heap;
use crate::lang::value::Value;

/// Image format version (increment on breaking changes).
pub const IMAGE_VERSION: u8 = 1;

/// Heap-independent constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Bool(bool),
    Char(u8),
    Real(f64),
    Integer(i64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkImage {
    pub code: Vec<u8>,
    pub lines: Vec<LineRun>,
    pub constants: Vec<Constant>,
}

impl ChunkImage {
    /// Snapshots `chunk`, resolving string constants through `heap`.
    pub fn from_chunk(chunk: &Chunk, heap: &Heap) -> Result<Self, ImageError> {
        let constants = chunk
            .constants
            .iter()
            .enumerate()
            .map(|(index, value)| -> Result<Constant, ImageError> {
                Ok(match value {
                    Value::Bool(b) => Constant::Bool(*b),
                    Value::Char(c) => Constant::Char(*c),
                    Value::Real(r) => Constant::Real(*r),
                    Value::Integer(n) => Constant::Integer(*n),
                    Value::Obj(r) => {
                        let text = heap.as_str(*r).ok_or(ImageError::DanglingString { index })?;
                        Constant::Str(text.to_string())
                    }
                })
            })
            .collect::<Result<Vec<_>, ImageError>>()?;

        Ok(ChunkImage {
            code: chunk.code.clone(),
            lines: chunk.lines().to_vec(),
            constants,
        })
    }

    /// Rebuilds a chunk whose string constants are interned into `heap`.
    pub fn into_chunk(self, heap: &mut Heap) -> Result<Chunk, ImageError> {
        let constants = self
            .constants
            .into_iter()
            .map(|c| match c {
                Constant::Bool(b) => Value::Bool(b),
                Constant::Char(c) => Value::Char(c),
                Constant::Real(r) => Value::Real(r),
                Constant::Integer(n) => Value::Integer(n),
                Constant::Str(s) => Value::Obj(heap.copy_string(&s)),
            })
            .collect();

        Chunk::from_parts(self.code, constants, self.lines).ok_or(ImageError::LineTable)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ImageError> {
        let body =
            postcard::to_allocvec(self).map_err(|e| ImageError::Serialization(e.to_string()))?;

        let mut bytes = Vec::with_capacity(body.len() + 1);
        bytes.push(IMAGE_VERSION);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let (&version, body) = bytes.split_first().ok_or(ImageError::Empty)?;
        if version != IMAGE_VERSION {
            return Err(ImageError::Version {
                found: version,
                expected: IMAGE_VERSION,
            });
        }
        postcard::from_bytes(body).map_err(|e| ImageError::Deserialization(e.to_string()))
    }
}

/// Writes the image of `chunk` to `path`.
pub fn write_image(path: &Path, chunk: &Chunk, heap: &Heap) -> Result<(), ImageError> {
    let bytes = ChunkImage::from_chunk(chunk, heap)?.encode()?;
    debug!(path = %path.display(), bytes = bytes.len(), "writing bytecode image");
    std::fs::write(path, bytes).map_err(|e| ImageError::Io(e.to_string()))
}

/// Reads an image from `path` and loads it into `heap`.
pub fn load_image(path: &Path, heap: &mut Heap) -> Result<Chunk, ImageError> {
    let bytes = std::fs::read(path).map_err(|e| ImageError::Io(e.to_string()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read bytecode image");
    ChunkImage::decode(&bytes)?.into_chunk(heap)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("empty image")]
    Empty,

    #[error("unsupported image version {found} (expected {expected})")]
    Version { found: u8, expected: u8 },

    #[error("line table does not cover the code")]
    LineTable,

    #[error("constant {index} refers to a string missing from the heap")]
    DanglingString { index: usize },
}
