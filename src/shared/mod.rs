pub mod constants;
pub mod time_format;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;
