pub mod executor;
pub mod handlers;
pub mod patch;
pub mod propagate;
pub mod reconcile;
pub mod schema;
pub mod service;
pub mod slug;
