pub mod bits;
pub mod constants;
mod error;
pub mod image;
mod instruction;
mod memory;
mod registers;

pub use {error::*, instruction::*, memory::*, registers::*};
