pub mod celebration;
pub mod dom;
pub mod flash;
pub mod history;
pub mod notifications;
pub mod timers;
pub mod toolkit;
