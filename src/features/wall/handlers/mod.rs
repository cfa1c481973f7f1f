pub mod wall_handler;

pub use wall_handler::*;
