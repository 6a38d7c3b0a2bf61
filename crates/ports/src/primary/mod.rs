pub mod firewall_control;
pub mod packet_filter;
