pub mod flag;
pub mod pending;
pub mod route;
pub mod run;
pub mod secret;
