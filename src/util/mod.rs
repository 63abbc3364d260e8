//! 通用工具

mod resizeable_array;

pub use resizeable_array::ResizeableDoubleArray;
