pub mod order;
pub mod orders;
pub mod pick_deliver;
pub mod route;
pub mod solution;
pub mod stop_node;
pub mod time_window;
pub mod vehicle;

pub use order::Order;
pub use orders::Orders;
pub use pick_deliver::PickDeliver;
pub use route::Route;
pub use solution::{Solution, StopRow, VehicleStops};
pub use stop_node::{StopKind, StopNode};
pub use time_window::TimeWindow;
pub use vehicle::Vehicle;
