pub mod check;
pub mod inventory;
pub mod pv_check;
pub mod version;
