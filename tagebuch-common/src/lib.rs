pub mod model;
pub mod password;
pub mod token;
