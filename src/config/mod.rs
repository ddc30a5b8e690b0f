//! Configuration module

mod site;

pub use site::AcceptancePolicy;
pub use site::CommentsConfig;
pub use site::ContentConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
