mod support;

mod audit_log_tests;
mod config_test;
mod encoding_test;
mod error_test;
