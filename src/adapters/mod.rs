// Adapters layer: concrete implementations of the compliance service port.

pub mod http;
pub mod mock;

pub use http::HttpComplianceClient;
pub use mock::MockComplianceService;
