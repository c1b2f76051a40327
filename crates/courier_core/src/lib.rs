pub mod assignment;
pub mod clock;
pub mod compare;
pub mod dispatch;
pub mod ecs;
pub mod grid;
pub mod orders;
pub mod placement;
pub mod pricing;
pub mod route_optimizer;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod search;
pub mod systems;
pub mod telemetry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
