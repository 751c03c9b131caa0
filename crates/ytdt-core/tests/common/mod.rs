pub mod fake_extension;
