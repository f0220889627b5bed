pub mod distance_method;
pub mod load;
pub mod location;
pub mod route_costs;
pub mod route_problem;
pub mod stop;
pub mod time_window;
pub mod travel_matrices;
pub mod vehicle;
