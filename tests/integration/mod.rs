// Integration tests for API endpoints
// These tests focus on complete request/response cycles through the router with authentication

pub mod api_test;
