//! API integration tests against in-process collaborators.

mod api_tests;
mod support;
mod video_tests;
