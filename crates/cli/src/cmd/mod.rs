mod check;
mod info;
mod load;
mod locate;
mod matrix;

pub use check::cmd_check;
pub use info::cmd_info;
pub use load::cmd_load;
pub use locate::cmd_locate;
pub use matrix::cmd_matrix;
