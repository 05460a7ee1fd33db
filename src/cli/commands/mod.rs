pub mod resume;
pub mod route;
pub mod run;
pub mod spend;
pub mod validate;
