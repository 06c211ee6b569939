pub mod direct;
pub mod transport;
pub mod web_socket_transport;
