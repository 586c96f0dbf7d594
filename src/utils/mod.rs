pub mod auth;
pub mod error;
pub mod logging;
pub mod response;
pub mod shutdown;

pub use response::BaseResponse;
pub use response::ErrorResponse;
