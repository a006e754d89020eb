pub mod event;
pub mod highlights;
pub mod matrix;
pub mod pnl;
pub mod upcoming;
