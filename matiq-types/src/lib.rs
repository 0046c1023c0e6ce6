pub mod data_type;
pub mod error;
pub mod mat_class;
pub mod sample;
pub mod value;

pub use data_type::*;
pub use error::*;
pub use mat_class::*;
pub use sample::*;
pub use value::*;

pub use num_complex::Complex64;
