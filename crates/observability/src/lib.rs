//! AgentKern Control Plane: Observability
//!
//! Correlation identifier propagation (`correlation`), structured JSON
//! logging (`logging`), and PII redaction (`redact`) shared by every
//! component that touches an inbound event or emits a log line.

pub mod correlation;
pub mod logging;
pub mod redact;

pub use correlation::{CORRELATION_HEADER, generate as generate_correlation_id, resolve as resolve_correlation_id};
pub use logging::{LogFormat, init as init_logging};
pub use redact::{RedactionMode, Redactor};
