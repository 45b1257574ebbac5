pub mod common_io;
pub mod ndarray_io;
pub mod traits;
