pub mod best;
pub mod checkpoint;
pub mod config;
pub mod data;
pub mod device;
pub mod distiller;
pub mod error;
pub mod evaluator;
pub mod identity;
pub mod loss;
pub mod pipeline;
pub mod registry;
pub mod role;
pub mod schedule;
pub mod tracking;

pub use config::{Config, ConfigDocument};
pub use distiller::{Distiller, TrainingSummary};
pub use error::{DistillErr, Result};
pub use role::Role;
