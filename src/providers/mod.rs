pub mod amfi;
pub mod util;
