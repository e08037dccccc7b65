pub mod alert_server;
pub mod forex;
pub mod options_cycle;
pub mod recent_signals;

pub use alert_server::AlertServerArgs;
pub use forex::ForexArgs;
pub use options_cycle::OptionsCycleArgs;
pub use recent_signals::RecentSignalsArgs;
