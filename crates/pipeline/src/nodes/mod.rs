//! Built-in node kinds.

pub mod adder;
pub mod rand_source;
pub mod vec_sink;
pub mod vec_source;

pub use adder::Adder;
pub use rand_source::RandSource;
pub use vec_sink::VecSink;
pub use vec_source::VecSource;
