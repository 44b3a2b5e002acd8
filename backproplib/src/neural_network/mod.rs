pub mod float;
pub mod shape;
pub mod affine;
pub mod activations;
pub mod losses;
pub mod gradient_check;

pub mod prelude {
    pub use super::float::*;
    pub use super::shape::*;
    pub use super::affine::*;
    pub use super::activations::*;
    pub use super::losses::*;
    pub use super::gradient_check::*;
}
