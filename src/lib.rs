//! Backend for the ProAuthenticate farm marketplace: registration, login and
//! identity lookup with hashed credentials and JWT bearer tokens, product and
//! admin resource routes, origin-gated CORS, and a typed API client adapter.

pub mod admin;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod cors;
pub mod error;
pub mod products;
pub mod response;
pub mod state;
