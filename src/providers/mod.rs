pub mod bcb_sgs;
pub mod cepea;
pub mod ipeadata;
pub mod ptax;
pub mod util;
