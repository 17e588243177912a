pub mod connect;
pub mod radii;
