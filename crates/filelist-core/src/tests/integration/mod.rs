#![cfg(test)]

pub mod common;
pub mod provider_tests;
