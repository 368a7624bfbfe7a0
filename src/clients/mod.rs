#[cfg(feature = "aws-sdk")]
pub mod aws;
pub mod mock;

#[cfg(feature = "aws-sdk")]
pub use aws::*;
pub use mock::*;
