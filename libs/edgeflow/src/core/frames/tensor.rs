// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Model input/output tensors.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::error::{EdgeFlowError, Result};

/// Element type of a tensor. Values are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    I64,
    F32,
}

impl DType {
    pub fn size(self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::U16 | DType::I16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::I64 => 8,
        }
    }

    fn read(self, raw: &[u8]) -> f32 {
        match self {
            DType::U8 => raw[0] as f32,
            DType::I8 => raw[0] as i8 as f32,
            DType::U16 => u16::from_le_bytes([raw[0], raw[1]]) as f32,
            DType::I16 => i16::from_le_bytes([raw[0], raw[1]]) as f32,
            DType::U32 => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32,
            DType::I32 => i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32,
            DType::F32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            DType::I64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&raw[..8]);
                i64::from_le_bytes(b) as f32
            }
        }
    }

    fn write(self, value: f32, out: &mut [u8]) {
        match self {
            DType::U8 => out[0] = value as u8,
            DType::I8 => out[0] = (value as i8) as u8,
            DType::U16 => out.copy_from_slice(&(value as u16).to_le_bytes()),
            DType::I16 => out.copy_from_slice(&(value as i16).to_le_bytes()),
            DType::U32 => out.copy_from_slice(&(value as u32).to_le_bytes()),
            DType::I32 => out.copy_from_slice(&(value as i32).to_le_bytes()),
            DType::F32 => out.copy_from_slice(&value.to_le_bytes()),
            DType::I64 => out.copy_from_slice(&(value as i64).to_le_bytes()),
        }
    }
}

/// Shape and type of one model input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDesc {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl TensorDesc {
    pub fn new(name: impl Into<String>, dtype: DType, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn size_bytes(&self) -> usize {
        self.element_count() * self.dtype.size()
    }
}

#[derive(Debug)]
enum TensorStorage {
    Unallocated,
    Owned(Vec<u8>),
    Aliased(Bytes),
}

/// A tensor buffer owned by an executor, or aliasing capture memory.
#[derive(Debug)]
pub struct Tensor {
    desc: TensorDesc,
    storage: TensorStorage,
}

impl Tensor {
    /// A tensor with no backing memory yet (zero-copy inputs start here).
    pub fn unallocated(desc: TensorDesc) -> Self {
        Self {
            desc,
            storage: TensorStorage::Unallocated,
        }
    }

    /// A zero-filled tensor sized from its descriptor.
    pub fn allocated(desc: TensorDesc) -> Self {
        let len = desc.size_bytes();
        Self {
            desc,
            storage: TensorStorage::Owned(vec![0u8; len]),
        }
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self.storage, TensorStorage::Owned(_))
    }

    pub fn is_aliased(&self) -> bool {
        matches!(self.storage, TensorStorage::Aliased(_))
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.storage {
            TensorStorage::Unallocated => &[],
            TensorStorage::Owned(vec) => vec,
            TensorStorage::Aliased(bytes) => bytes,
        }
    }

    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            TensorStorage::Owned(vec) => Some(vec.as_mut_slice()),
            _ => None,
        }
    }

    /// Point this tensor at externally owned memory.
    pub fn alias(&mut self, data: Bytes) -> Result<()> {
        if self.is_allocated() {
            return Err(EdgeFlowError::InvalidState(format!(
                "Tensor '{}' owns an allocation and cannot alias capture memory",
                self.desc.name
            )));
        }
        let expected = self.desc.size_bytes();
        if data.len() != expected {
            return Err(EdgeFlowError::RuntimeIo(format!(
                "Tensor '{}' expects {} bytes, capture unit has {}",
                self.desc.name,
                expected,
                data.len()
            )));
        }
        self.storage = TensorStorage::Aliased(data);
        Ok(())
    }

    /// Drop an alias set by [`Tensor::alias`]. Owned storage is untouched.
    pub fn drop_alias(&mut self) {
        if self.is_aliased() {
            self.storage = TensorStorage::Unallocated;
        }
    }

    /// Copy `src` into the owned allocation.
    pub fn copy_from(&mut self, src: &[u8]) -> Result<()> {
        let name = self.desc.name.clone();
        let expected = self.desc.size_bytes();
        let dst = self.bytes_mut().ok_or_else(|| {
            EdgeFlowError::InvalidState(format!("Tensor '{}' has no owned allocation", name))
        })?;
        if src.len() != expected {
            return Err(EdgeFlowError::RuntimeIo(format!(
                "Tensor '{}' expects {} bytes, capture unit has {}",
                name,
                expected,
                src.len()
            )));
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Decode every element as `f32`.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        let size = self.desc.dtype.size();
        self.bytes()
            .chunks_exact(size)
            .map(|raw| self.desc.dtype.read(raw))
            .collect()
    }

    /// Encode `values` into the owned allocation, converting to the element type.
    pub fn write_f32(&mut self, values: &[f32]) -> Result<()> {
        let dtype = self.desc.dtype;
        let count = self.desc.element_count();
        let name = self.desc.name.clone();
        if values.len() != count {
            return Err(EdgeFlowError::Inference(format!(
                "Tensor '{}' holds {} elements, got {}",
                name,
                count,
                values.len()
            )));
        }
        let dst = self.bytes_mut().ok_or_else(|| {
            EdgeFlowError::InvalidState(format!("Tensor '{}' has no owned allocation", name))
        })?;
        for (chunk, value) in dst.chunks_exact_mut(dtype.size()).zip(values) {
            dtype.write(*value, chunk);
        }
        Ok(())
    }

    pub fn release(&mut self) {
        self.storage = TensorStorage::Unallocated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> TensorDesc {
        TensorDesc::new("input", DType::U8, vec![1, 2, 2, 3])
    }

    #[test]
    fn test_size_from_shape() {
        assert_eq!(desc().size_bytes(), 12);
        assert_eq!(
            TensorDesc::new("out", DType::F32, vec![1, 1001]).size_bytes(),
            4004
        );
    }

    #[test]
    fn test_alias_requires_matching_length() {
        let mut t = Tensor::unallocated(desc());
        assert!(t.alias(Bytes::from(vec![0u8; 11])).is_err());
        t.alias(Bytes::from(vec![0u8; 12])).unwrap();
        assert!(t.is_aliased());
        t.drop_alias();
        assert!(!t.is_aliased());
        assert!(t.bytes().is_empty());
    }

    #[test]
    fn test_owned_tensor_cannot_alias() {
        let mut t = Tensor::allocated(desc());
        assert!(t.alias(Bytes::from(vec![0u8; 12])).is_err());
    }

    #[test]
    fn test_copy_into_owned() {
        let mut t = Tensor::allocated(desc());
        t.copy_from(&[3u8; 12]).unwrap();
        assert_eq!(t.bytes(), &[3u8; 12]);
        assert!(t.copy_from(&[3u8; 4]).is_err());
    }

    #[test]
    fn test_f32_values() {
        let mut t = Tensor::allocated(TensorDesc::new("scores", DType::F32, vec![3]));
        t.write_f32(&[0.25, 1.5, -2.0]).unwrap();
        assert_eq!(t.to_f32_vec(), vec![0.25, 1.5, -2.0]);

        let mut ints = Tensor::allocated(TensorDesc::new("classes", DType::I64, vec![2]));
        ints.write_f32(&[4.0, 9.0]).unwrap();
        assert_eq!(ints.to_f32_vec(), vec![4.0, 9.0]);
    }
}
