pub mod expansion;
pub mod intent;
pub mod title;
