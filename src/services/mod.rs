pub mod aggregator;
pub mod periods;
