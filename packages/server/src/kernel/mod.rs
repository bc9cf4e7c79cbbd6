//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod scheduled_tasks;
pub mod server_kernel;
pub mod service_host;
pub mod telemetry;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ServerDeps, SqliteUserRegistry, TelegramAdapter};
pub use scheduled_tasks::build_service_host;
pub use server_kernel::{connect_database, ServerKernel};
pub use service_host::{Service, ServiceHost};
pub use telemetry::init_tracing;
pub use test_dependencies::TestDependencies;
pub use traits::*;
