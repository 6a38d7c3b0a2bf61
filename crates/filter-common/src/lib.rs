#![no_std]

pub mod firewall;
pub mod net;
