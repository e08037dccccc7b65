pub mod handlers;
pub mod server;

pub use handlers::{AlertLog, AlertRecord, AlertRequest};
pub use server::ApiServer;
