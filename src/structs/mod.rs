pub mod parameters;
pub mod trajectory;
