pub mod posts;
pub mod wall;
