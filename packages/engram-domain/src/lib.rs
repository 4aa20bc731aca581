pub mod headers;
pub mod kinds;
pub mod transcript;
