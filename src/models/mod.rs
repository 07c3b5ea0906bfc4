pub mod conversation;
pub mod enums;
pub mod history;
pub mod patient;
pub mod report;

pub use conversation::*;
pub use history::*;
pub use patient::*;
pub use report::*;
