pub mod network_errors;
