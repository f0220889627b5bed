pub mod compare_routes;
pub mod deviation;
pub mod geometry;
pub mod scenario;
pub mod simulate_route;
