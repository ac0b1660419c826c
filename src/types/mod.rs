// ABOUTME: Validated domain types shared across runtime and install code.
// ABOUTME: Endpoints are parsed once and carried as typed values afterwards.

mod endpoint;

pub use endpoint::{Endpoint, ParseEndpointError, Scheme};
