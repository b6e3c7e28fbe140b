pub mod antminer;
pub mod whatsminer;

pub use antminer::AntminerModel;
pub use whatsminer::WhatsminerModel;
