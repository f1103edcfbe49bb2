pub mod error;
pub mod mapper;
pub mod todo;
pub mod validation;

pub use error::*;
pub use mapper::*;
pub use todo::*;
pub use validation::*;
