pub mod performance_model;
pub mod performance_service;
pub mod xirr;

pub use performance_model::*;
pub use performance_service::*;
pub use xirr::solve_xirr;
