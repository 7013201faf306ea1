pub mod live;
pub mod poll;
pub mod vote;
