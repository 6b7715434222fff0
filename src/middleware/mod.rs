pub mod authenticate;
pub mod throttle;
