pub mod key_numbers;
pub mod predictor;
pub mod signals;
