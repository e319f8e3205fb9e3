pub mod facts;

pub use facts::{FactExtractor, Facts, RegexFactExtractor, render_facts};
