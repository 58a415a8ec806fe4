//! Value Objects - Immutable, identity-less domain primitives

mod coordinates;
mod destination;

pub use coordinates::Coordinates;
pub use destination::Destination;
