//! Token domain entities.

pub mod model;
pub mod pair;
pub mod status;

pub use model::RefreshTokenRecord;
pub use pair::TokenPair;
pub use status::RefreshTokenStatus;
