//! Integration tests for Ripple-Crawl

mod crawl_tests;
