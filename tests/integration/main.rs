// Integration tests


mod api_test;
mod credits_test;
mod race_condition_test;
