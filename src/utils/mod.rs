pub mod persistence;

pub use persistence::write_pretty_json;
