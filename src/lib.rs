pub mod error;
pub mod flow;
pub mod sim;
pub mod util;
pub mod workload;

pub use error::FlowError;

#[cfg(test)]
mod test;
