//! Integration tests for snapcrawl
//!
//! `engine_tests` drive the crawl engine against an in-memory site;
//! `http_tests` crawl a wiremock server end-to-end and write the artifacts.

mod engine_tests;
mod http_tests;
mod support;
