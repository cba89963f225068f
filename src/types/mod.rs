// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod enums;
pub mod game_info;

pub use enums::{CartType, Mode};
pub use game_info::GameInfo;
