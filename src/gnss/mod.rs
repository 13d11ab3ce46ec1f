
pub mod gps_l1_ca;
pub mod synchro;
