pub mod codec;
pub mod correlator;
pub mod rewriter;
