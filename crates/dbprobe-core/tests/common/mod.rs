pub mod fake_db;
