pub mod translator;

pub use translator::{OrderQuery, QueryTranslator, RawOrderParams, UpstreamParams};
