pub mod executor;
pub mod factory;
pub mod fixer;
pub mod git;
pub mod services;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;
