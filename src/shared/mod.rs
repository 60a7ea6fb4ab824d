pub mod constants;
pub mod filename;
#[cfg(test)]
pub mod test_helpers;
pub mod types;
pub mod validation;
