//! 可增长的 f64 数组
//!
//! 按倍数扩容的数值数组，用作按资源存放的采样序列以及分发器的并行数组。
//! 越界访问返回错误，不做静默截断。

use crate::error::FlowError;

const DEFAULT_CAPACITY: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct ResizeableDoubleArray {
    elements: Box<[f64]>,
    len: usize,
}

impl ResizeableDoubleArray {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: vec![0.0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    /// 追加到末尾
    pub fn add(&mut self, value: f64) {
        if self.len == self.elements.len() {
            self.grow();
        }
        self.elements[self.len] = value;
        self.len += 1;
    }

    /// 插入到 `index`，后续元素整体后移
    pub fn insert(&mut self, index: usize, value: f64) -> Result<(), FlowError> {
        if index > self.len {
            return Err(self.out_of_range(index));
        }
        if self.len == self.elements.len() {
            self.grow();
        }
        self.elements.copy_within(index..self.len, index + 1);
        self.elements[index] = value;
        self.len += 1;
        Ok(())
    }

    pub fn add_first(&mut self, value: f64) {
        // index 0 永远合法
        let _ = self.insert(0, value);
    }

    /// 删除 `index` 处的元素并返回它，后续元素整体前移
    pub fn remove(&mut self, index: usize) -> Result<f64, FlowError> {
        if index >= self.len {
            return Err(self.out_of_range(index));
        }
        let value = self.elements[index];
        self.elements.copy_within(index + 1..self.len, index);
        self.len -= 1;
        Ok(value)
    }

    pub fn get(&self, index: usize) -> Result<f64, FlowError> {
        if index >= self.len {
            return Err(self.out_of_range(index));
        }
        Ok(self.elements[index])
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), FlowError> {
        if index >= self.len {
            return Err(self.out_of_range(index));
        }
        self.elements[index] = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.elements[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn grow(&mut self) {
        let new_cap = (self.elements.len() * 2).max(DEFAULT_CAPACITY);
        let mut grown = vec![0.0; new_cap].into_boxed_slice();
        grown[..self.len].copy_from_slice(&self.elements[..self.len]);
        self.elements = grown;
    }

    fn out_of_range(&self, index: usize) -> FlowError {
        FlowError::IndexOutOfRange {
            index,
            len: self.len,
        }
    }
}

impl FromIterator<f64> for ResizeableDoubleArray {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut arr = Self::new();
        for v in iter {
            arr.add(v);
        }
        arr
    }
}
