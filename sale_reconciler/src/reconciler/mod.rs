pub mod api;
pub mod confirmation;
pub mod transitions;
