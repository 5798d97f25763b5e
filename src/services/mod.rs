pub mod directory;
pub mod factory;
pub mod identity;
pub mod proxy;
