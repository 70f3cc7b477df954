pub mod gumbel;

pub use gumbel::*;
