//! Networking: the ethernet uclass and distributed switch architecture

#[cfg(feature = "dsa")]
pub mod dsa;
#[cfg(all(feature = "dsa", feature = "sandbox"))]
pub mod dsa_sandbox;
pub mod eth;
#[cfg(feature = "sandbox")]
pub mod sandbox;
