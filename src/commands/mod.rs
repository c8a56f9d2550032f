pub mod digest;
pub mod schema;
pub mod serve;
