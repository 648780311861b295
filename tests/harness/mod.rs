//! Test harness utilities for end-to-end client tests.
//!
//! The client under test always talks to a real TCP listener on
//! `127.0.0.1:0` played by [`TestServer`].

#![allow(dead_code)]

mod server;

pub use server::{Script, TestServer};
