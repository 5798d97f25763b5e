pub mod claims;
pub mod resolver;

pub use claims::IdentityClaims;
