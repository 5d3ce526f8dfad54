pub mod process;
pub mod prompt;
pub mod sys;
