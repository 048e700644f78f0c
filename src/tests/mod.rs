//! Consolidated end-to-end tests for the authentication flows.

mod auth_e2e;
