//! HTTP surface tests.

mod handler_tests;
