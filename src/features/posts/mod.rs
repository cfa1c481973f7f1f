//! Posts: the only domain entity of the wall, and the data access around it.

pub mod models;
pub mod services;

pub use services::PostRepository;
