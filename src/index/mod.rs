pub mod builder;
pub mod bwt;
pub mod fm;
pub mod rank;
pub mod sa;
