pub mod location;
pub mod pending;

pub use location::{LocationError, LocationRecord, LocationStore};
pub use pending::{PendingRequestStore, RequestStatus};

/// Source tag under which the browser reports its geolocation.
pub const BROWSER_SOURCE: &str = "browser";
