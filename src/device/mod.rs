pub mod btle;
pub mod constants;
pub mod enable;
pub mod permissions;
pub mod radio;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
