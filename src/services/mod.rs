pub mod energy;

pub use energy::EnergyService;
