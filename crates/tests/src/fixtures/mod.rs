pub mod fake_stripe;
pub mod seed;
pub mod test_app;
