pub mod output;

pub use output::Output;
