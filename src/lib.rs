pub mod analyzers;
pub mod categories;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod output;
pub mod parser;
pub mod record;
pub mod source;
