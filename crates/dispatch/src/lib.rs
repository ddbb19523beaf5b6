//! Dispatch and correlation of GitHub check events for wpt.fyi.
//!
//! [`Checks::handle_event`] takes a verified webhook delivery and decides whether to
//! create a check suite, schedule results processing, update a check run, forward the
//! event to another CI integration, or do nothing. All I/O goes through the traits in
//! [`ports`].

mod dispatch;
pub mod error;
pub mod events;
mod gate;
mod identity;
pub mod outcome;
pub mod ports;
mod product;
mod pull;
mod router;
mod run;
mod suite;
#[cfg(test)]
mod testing;

pub use dispatch::Backend;
pub use error::CheckError;
pub use identity::AppIdentity;
pub use outcome::{Ignored, Outcome};
pub use product::ProductNameResolver;
pub use router::{Checks, Collaborators};
