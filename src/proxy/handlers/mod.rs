pub mod location;
pub mod run;
pub mod session;
pub mod sse;
