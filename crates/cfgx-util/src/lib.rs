pub mod number;
pub mod quote;
